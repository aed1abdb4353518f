pub mod supabase;
pub mod state;

pub use state::AppState;
pub use supabase::SupabaseClient;
