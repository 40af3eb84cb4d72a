//! Where transferred bytes come from and go to.
//!
//! A transfer reads from a [`ByteSource`] when uploading and writes to a
//! [`ByteSink`] when downloading. Adapters are provided for anything that
//! implements `std::io::Read` or `std::io::Write`, and for files on disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

/// Produces the bytes of an upload in order.
pub trait ByteSource {
    /// Reads up to `max` bytes. Fewer than `max` means the data is exhausted.
    fn read(&mut self, max: usize) -> io::Result<Vec<u8>>;

    /// Releases whatever backs the source.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Accepts the bytes of a download in order.
pub trait ByteSink {
    /// Appends `bytes`.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flushes and commits everything written so far.
    fn close(&mut self) -> io::Result<()>;

    /// Throws away a transfer that did not complete.
    fn abort(&mut self) {}
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read(&mut self, max: usize) -> io::Result<Vec<u8>> {
        (**self).read(max)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn abort(&mut self) {
        (**self).abort()
    }
}

impl ByteSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A source over any reader.
pub struct ReadSource<R> {
    reader: R,
}

impl<R: Read> ReadSource<R> {
    /// Wraps `reader`.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0; max];
        let mut filled = 0;

        // `Read::read` may come up short before EOF; keep going until the
        // block is full or the reader is dry.
        while filled < max {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}

/// A sink over any writer.
pub struct WriteSink<W> {
    writer: W,
}

impl<W: Write> WriteSink<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ByteSink for WriteSink<W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    fn close(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Reads an upload from a file on disk.
pub struct FileSource {
    path: PathBuf,
    inner: Option<ReadSource<File>>,
}

impl FileSource {
    /// Opens `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        Ok(Self {
            path,
            inner: Some(ReadSource::new(file)),
        })
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, max: usize) -> io::Result<Vec<u8>> {
        match self.inner.as_mut() {
            Some(inner) => inner.read(max),
            None => Err(io::Error::new(
                ErrorKind::Other,
                format!("{} is already closed", self.path.display()),
            )),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner = None;
        Ok(())
    }
}

/// Writes a download to a file on disk.
///
/// Bytes go to a hidden sibling of the destination. Only `close` moves it
/// into place, so a failed download never leaves a truncated file under the
/// requested name.
pub struct FileSink {
    dest: PathBuf,
    partial: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Creates the partial file next to `dest`.
    pub fn create<P: AsRef<Path>>(dest: P) -> io::Result<Self> {
        let dest = dest.as_ref().to_path_buf();
        let name = dest
            .file_name()
            .ok_or_else(|| {
                io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("{} does not name a file", dest.display()),
                )
            })?
            .to_string_lossy()
            .into_owned();
        let partial = dest.with_file_name(format!(".{}.part", name));

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&partial)?;

        Ok(Self {
            dest,
            partial,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// The final location of the file.
    pub fn path(&self) -> &Path {
        &self.dest
    }
}

impl ByteSink for FileSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.write_all(bytes),
            None => Err(io::Error::new(
                ErrorKind::Other,
                format!("{} is already closed", self.dest.display()),
            )),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => return Ok(()),
        };

        let committed = commit(writer, &self.partial, &self.dest);

        if committed.is_err() {
            let _ = fs::remove_file(&self.partial);
        } else {
            debug!("wrote {}", self.dest.display());
        }
        committed
    }

    fn abort(&mut self) {
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.partial) {
                warn!("could not remove {}: {}", self.partial.display(), e);
            }
        }
    }
}

fn commit(mut writer: BufWriter<File>, partial: &Path, dest: &Path) -> io::Result<()> {
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);
    fs::rename(partial, dest)
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.abort();
    }
}
