pub mod album;
pub mod artist;
pub mod genre;
pub mod ids;
pub mod log;
pub mod raw;
pub mod track;

pub use album::Album;
pub use artist::{is_adult, parse_date, Artist, DATE_FORMAT, MINIMUM_ARTIST_AGE};
pub use genre::Genre;
pub use ids::{AlbumId, ArtistId, GenreId, LogEntryId, TrackId};
pub use log::{LogEntry, Operation};
pub use raw::{RawAlbum, RawArtist, RawDataset, RawGenre, RawTrack};
pub use track::Track;
