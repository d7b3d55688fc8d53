use crate::config::ConfigStore;
use crate::frame::Frame;
use crate::store::Store;

/// Runs a parsed command and produces its reply. Execution never fails: anything a client can
/// get wrong is rejected while parsing.
pub trait Executable {
    fn exec(self, store: &Store, params: &ConfigStore) -> Frame;
}
