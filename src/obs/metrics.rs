// self
use crate::obs::{RefreshOutcome, RefreshTrigger};

/// Records a refresh outcome via the global metrics recorder (when enabled).
pub fn record_refresh_outcome(trigger: RefreshTrigger, outcome: RefreshOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"bearer_command_refresh_total",
			"trigger" => trigger.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (trigger, outcome);
	}
}
