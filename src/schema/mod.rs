//! Schema module
//!
//! Declares the shape of both sides of the pipeline.
//!
//! # Features
//!
//! - **Source Schemas**: field names, JSON types and nullability of the raw
//!   catalog and session records, used to validate every input file
//! - **Table Schemas**: Arrow schemas of the five derived star-schema tables

mod tables;
mod types;

pub use tables::{
    artists_schema, catalog_source, session_source, songplays_schema, songs_schema,
    table_schema, time_schema, users_schema, CATALOG_FIELDS, SESSION_FIELDS,
};
pub use types::{FieldKind, SourceField, SourceSchema};

/// Raw catalog record field names
pub mod catalog {
    pub const SONG_ID: &str = "song_id";
    pub const TITLE: &str = "title";
    pub const ARTIST_ID: &str = "artist_id";
    pub const ARTIST_NAME: &str = "artist_name";
    pub const ARTIST_LOCATION: &str = "artist_location";
    pub const ARTIST_LATITUDE: &str = "artist_latitude";
    pub const ARTIST_LONGITUDE: &str = "artist_longitude";
    pub const DURATION: &str = "duration";
    pub const YEAR: &str = "year";
}

/// Raw session record field names
pub mod session {
    pub const USER_ID: &str = "userId";
    pub const FIRST_NAME: &str = "firstName";
    pub const LAST_NAME: &str = "lastName";
    pub const GENDER: &str = "gender";
    pub const LEVEL: &str = "level";
    pub const PAGE: &str = "page";
    pub const SONG: &str = "song";
    pub const ARTIST: &str = "artist";
    pub const LENGTH: &str = "length";
    pub const SESSION_ID: &str = "sessionId";
    pub const LOCATION: &str = "location";
    pub const USER_AGENT: &str = "userAgent";
    pub const TS: &str = "ts";

    /// Columns appended by the session transformer
    pub const TIMESTAMP: &str = "timestamp";
    pub const DATETIME: &str = "datetime";

    /// Page value that marks an actual play
    pub const NEXT_SONG: &str = "NextSong";
}

#[cfg(test)]
mod tests;
