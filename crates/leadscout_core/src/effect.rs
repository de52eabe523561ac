use crate::ScrapeRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartRun(ScrapeRequest),
    CancelRun,
}
