pub mod errors;
pub mod model;
pub mod normalize;
pub mod picker;
pub mod policy;
pub mod radio;

mod runner;

pub use errors::SelectError;
pub use model::{Choice, MatchKind, OptionEntry, PreferenceSet, SelectReport, SelectionPreference};
pub use picker::{choose, choose_one, choose_with_phrases, is_placeholder};
pub use policy::SelectPolicyView;
pub use radio::{choose_radio, radio_entries, RadioRule};
pub use runner::{apply, read_options};
