//! Row-level statements shared by [`Database`](super::Database) and the
//! migration stages, which run them inside their own transactions.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::model::{parse_date, Album, Artist, Genre, Track, DATE_FORMAT};

pub fn insert_genre(conn: &Connection, genre: &Genre) -> Result<()> {
    conn.execute(
        "INSERT INTO genres (genre_id, name) VALUES (?1, ?2)",
        rusqlite::params![genre.id, genre.name],
    )?;
    Ok(())
}

pub fn insert_artist(conn: &Connection, artist: &Artist) -> Result<()> {
    conn.execute(
        "INSERT INTO artists (artist_id, name, birth_date, genre_id) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            artist.id,
            artist.name,
            artist.birth_date.map(|d| d.format(DATE_FORMAT).to_string()),
            artist.genre_id,
        ],
    )?;
    Ok(())
}

pub fn insert_album(conn: &Connection, album: &Album) -> Result<()> {
    conn.execute(
        "INSERT INTO albums (album_id, title, release_date, release_date_normalized, artist_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            album.id,
            album.title,
            album.release_date,
            album.release_date_normalized,
            album.artist_id,
        ],
    )?;
    Ok(())
}

pub fn insert_track(conn: &Connection, track: &Track) -> Result<()> {
    conn.execute(
        "INSERT INTO tracks (track_id, title, duration, album_id) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![track.id, track.title, track.duration, track.album_id],
    )?;
    Ok(())
}

/// The `label_column` value of the row keyed `id` in `table`, if that row
/// exists. Used to tell a re-published row from an id reused for something
/// else.
pub fn existing_label(
    conn: &Connection,
    table: &str,
    id_column: &str,
    label_column: &str,
    id: i64,
) -> Result<Option<String>> {
    let label = conn
        .query_row(
            &format!("SELECT {label_column} FROM {table} WHERE {id_column} = ?1"),
            [id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(label)
}

pub(crate) fn row_to_artist(row: &Row) -> rusqlite::Result<Artist> {
    let birth_date: Option<String> = row.get(2)?;
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        birth_date: birth_date.as_deref().and_then(parse_date),
        genre_id: row.get(3)?,
    })
}

pub(crate) fn row_to_album(row: &Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        title: row.get(1)?,
        release_date: row.get(2)?,
        release_date_normalized: row.get(3)?,
        artist_id: row.get(4)?,
    })
}
