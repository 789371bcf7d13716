// Services layered over process management
pub mod page_manager;
pub mod simulation;

pub use page_manager::{Page, PageError, PageId, PageManager, PageState, Transition};
pub use simulation::{EventError, Simulation, SimulationHandle};
