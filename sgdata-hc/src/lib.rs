//! sgdata-hc library - Hawker centre closure calendars
//!
//! Fetches NEA hawker closure records from data.gov.sg, groups them around
//! MRT/LRT stations and writes one iCalendar file per station.

pub mod calendar;
pub mod cluster;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod sources;

pub use calendar::{CalendarBuilder, CalendarDocument, CalendarEvent};
pub use cluster::{cluster, Clusters, ReferencePoints};
pub use config::{Config, ConfigOverrides};
pub use error::{HcError, Result};
pub use models::{ClosureEntry, ClosureFeed, PassReport, ReferencePoint, SkipReason, Stage};
pub use pipeline::{build_calendars, Calendars, HawkerClosures};
