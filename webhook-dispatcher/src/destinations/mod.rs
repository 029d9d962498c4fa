mod file;
mod generic;
mod pagerduty;
mod slack;

pub use file::FileDestination;
pub use generic::GenericDestination;
pub use pagerduty::PagerDutyDestination;
pub use slack::SlackDestination;
