//! Gazetteer Module
//!
//! Alias-indexed lookup over four entity domains (LOCATION, REGION,
//! GROUP, DIRECTION) with:
//! - One normalization function applied at load and query time
//! - Reversible 64-bit packed coordinate identities for locales
//! - Linear geospatial scans (nearest, radius, same-name nearest)
//! - CSV lookup-table loading with semicolon-packed alias columns

mod alias;
mod coord;
mod entry;
mod index;
mod load;

pub use alias::{normalize_location_key, pack_aliases, unpack_aliases};
pub use coord::{decode_coord, encode_coord};
pub use entry::{DirectionEntry, GroupEntry, LocaleEntry, RegionEntry};
pub use index::{GazetteerError, GazetteerIndex, Result};
pub use load::{
    attach_group_polygons, dump_locale_patch, load_canonical, load_locale_patch, read_directions,
    read_groups, read_locales, read_regions, DIRECTION_LOOKUP, GROUP_LOOKUP, LOCALE_LOOKUP,
    REGION_LOOKUP,
};
