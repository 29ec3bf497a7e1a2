//! Concrete dashboard adapters, one per mini-app.
//!
//! Each module provides an [`AppSource`](pulse_core::AppSource); [`default_adapters`] wraps them
//! in [`Adapter`] in the order the router should prefer on ties.

mod text;

pub mod favorites;
pub mod focus;
pub mod habits;
pub mod notes;
pub mod photos;
pub mod profile;
pub mod rhythm;

pub use favorites::{FavoriteImage, FavoritesData, FavoritesSource};
pub use focus::{FocusData, FocusSession, FocusSource, FocusState};
pub use habits::{HabitRecord, HabitStat, HabitsData, HabitsSource};
pub use notes::{NoteRecord, NotesData, NotesSource};
pub use photos::{PhotoRecord, PhotosData, PhotosSource};
pub use profile::{ProfileRecord, ProfileSource};
pub use rhythm::{PatternRecord, PatternStat, RhythmData, RhythmSource};

use pulse_core::{Adapter, AdapterContext, AdapterRegistry, AppSource, DashboardAdapter};
use std::sync::Arc;

/// Every shipped adapter, in registration order.
pub fn default_adapters(ctx: &AdapterContext) -> Vec<Arc<dyn DashboardAdapter>> {
    vec![
        wrap(ProfileSource, ctx),
        wrap(NotesSource, ctx),
        wrap(PhotosSource, ctx),
        wrap(HabitsSource, ctx),
        wrap(RhythmSource, ctx),
        wrap(FocusSource, ctx),
        wrap(FavoritesSource::cats(), ctx),
        wrap(FavoritesSource::dogs(), ctx),
    ]
}

fn wrap<S: AppSource>(source: S, ctx: &AdapterContext) -> Arc<dyn DashboardAdapter> {
    Adapter::new(source, ctx.clone())
}

/// Registers [`default_adapters`] on `registry`.
pub fn register_defaults(registry: &mut AdapterRegistry, ctx: &AdapterContext) {
    for adapter in default_adapters(ctx) {
        registry.register(adapter);
    }
}
