pub mod peer;
pub mod torrent;
