pub mod state;
pub mod work_item;

pub use state::WorkItemState;
pub use work_item::{TaskType, WorkItem};
