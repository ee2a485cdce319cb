//! Storage of rendered [`Contract`] documents.
//!
//! [`Contract`]: crate::domain::Contract

use std::{
    collections::HashMap,
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use derive_more::{Display, Error as StdError, From};
use tracerr::Traced;

use crate::domain::{booking, contract};

/// Store of rendered [`Contract`] documents, keyed by [`booking::Id`].
///
/// Storing a document for the same [`Booking`] twice overwrites the previous
/// one, which makes contract regeneration idempotent at this layer.
///
/// [`Booking`]: crate::domain::Booking
/// [`Contract`]: crate::domain::Contract
#[derive(Clone, Debug)]
pub enum Documents {
    /// Documents stored as files under a directory.
    Filesystem {
        /// Directory the documents are stored under.
        dir: PathBuf,
    },

    /// Documents held in memory, for tests and local runs.
    InMemory(Arc<Mutex<HashMap<booking::Id, String>>>),
}

impl Documents {
    /// Creates a new filesystem-backed [`Documents`] store.
    #[must_use]
    pub fn filesystem(dir: impl Into<PathBuf>) -> Self {
        Self::Filesystem { dir: dir.into() }
    }

    /// Creates a new in-memory [`Documents`] store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(Mutex::new(HashMap::new())))
    }

    /// Stores the provided rendered document, overwriting a previously
    /// stored one, and returns the path it's reachable under.
    ///
    /// # Errors
    ///
    /// If the document cannot be written.
    pub fn store(
        &self,
        doc: &contract::Document,
    ) -> Result<contract::DocumentPath, Traced<Error>> {
        match self {
            Self::Filesystem { dir } => {
                let path = dir.join(format!("contract_{}.txt", doc.booking_id));
                std::fs::create_dir_all(dir)
                    .and_then(|()| std::fs::write(&path, &doc.text))
                    .map_err(tracerr::from_and_wrap!())?;
                Ok(path.to_string_lossy().into_owned().into())
            }
            Self::InMemory(docs) => {
                let mut docs = docs.lock().unwrap_or_else(|e| e.into_inner());
                drop(docs.insert(doc.booking_id, doc.text.clone()));
                Ok(format!("mem://contract_{}.txt", doc.booking_id).into())
            }
        }
    }

    /// Removes the stored document of the provided [`Booking`], if any.
    ///
    /// [`Booking`]: crate::domain::Booking
    ///
    /// # Errors
    ///
    /// If the document exists but cannot be removed.
    pub fn remove(
        &self,
        booking_id: booking::Id,
    ) -> Result<(), Traced<Error>> {
        match self {
            Self::Filesystem { dir } => {
                let path = dir.join(format!("contract_{booking_id}.txt"));
                match std::fs::remove_file(&path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(tracerr::new!(Error::from(e))),
                }
            }
            Self::InMemory(docs) => {
                let mut docs = docs.lock().unwrap_or_else(|e| e.into_inner());
                drop(docs.remove(&booking_id));
                Ok(())
            }
        }
    }

    /// Returns the stored document text of the provided [`Booking`], if any.
    ///
    /// [`Booking`]: crate::domain::Booking
    ///
    /// # Errors
    ///
    /// If the document exists but cannot be read.
    pub fn read(
        &self,
        booking_id: booking::Id,
    ) -> Result<Option<String>, Traced<Error>> {
        match self {
            Self::Filesystem { dir } => {
                let path = dir.join(format!("contract_{booking_id}.txt"));
                match std::fs::read_to_string(&path) {
                    Ok(text) => Ok(Some(text)),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(tracerr::new!(Error::from(e))),
                }
            }
            Self::InMemory(docs) => {
                let docs = docs.lock().unwrap_or_else(|e| e.into_inner());
                Ok(docs.get(&booking_id).cloned())
            }
        }
    }
}

/// [`Documents`] store error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Filesystem I/O failure.
    #[display("I/O operation failed: {_0}")]
    Io(io::Error),
}
