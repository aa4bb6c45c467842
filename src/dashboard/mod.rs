//! HTTP surface over the event stream: health, recent events, history,
//! source status, initial snapshot and a live SSE feed.

mod api;
mod error;
mod handlers;
mod server;
mod state;

pub use api::{
    HealthResponse, HistoryQuery, InitialResponse, RecentQuery, StreamStatusResponse,
    DEFAULT_HISTORY_LIMIT, DEFAULT_RECENT_COUNT,
};
pub use error::DashboardError;
pub use handlers::{
    get_events_sse, get_health, get_history, get_initial, get_recent, get_stream_status,
};
pub use server::DashboardServer;
pub use state::AppState;
