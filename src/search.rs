//! Include/exclude keyword search over indexed files.

pub mod criteria;
pub mod engine;
pub mod matcher;
pub mod planner;
pub mod protocol;
pub mod results;
pub mod worker;

pub use criteria::{SearchCriteria, SearchMode};
pub use engine::{SearchEngine, SearchHandle};
pub use matcher::CompiledMatcher;
pub use planner::ChunkPlanner;
pub use protocol::{SearchEvent, SearchHit, SearchProgress, SearchState, SearchSummary};
pub use results::ResultStore;
