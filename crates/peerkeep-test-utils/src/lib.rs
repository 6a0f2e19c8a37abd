pub mod helpers;
pub mod mock_gate;
pub mod mock_stack;

pub use helpers::*;
pub use mock_gate::MockConnectionGate;
pub use mock_stack::{MockDial, MockStack};
