pub mod filters;
pub mod macro_window;
pub mod plan;

pub use filters::{FilterConfig, FilterPipeline, SignalBar, SpikeMode};
pub use macro_window::MacroCalendar;
pub use plan::build_plan;
