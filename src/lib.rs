pub mod agent;
pub mod cli;
pub mod dom;
pub mod fill;
pub mod form;
pub mod message;
pub mod profile;
pub mod storage;
pub mod trace;

use crate::{
    agent::{
        analyzer::ProfileAnalyzer, autofill_model::AutofillReport, orchestrator::Autofill,
    },
    dom::page::Page,
    fill::filler::FormFiller,
    profile::profile_model::Profile,
};

/// Scan `page`, resolve every field against `profile` and fill it, typing
/// at the default human cadence.
pub fn run_autofill(page: &mut dyn Page, profile: &Profile) -> AutofillReport {
    let analyzer = ProfileAnalyzer::new(profile.clone());
    Autofill::new(FormFiller::default()).run(page, &analyzer)
}
