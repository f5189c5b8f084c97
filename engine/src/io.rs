//! Reading and writing data structures from and to disk.
//!
//! Every array is written raw (native byte order) into its own file.
//! Simple vectors use `Store::write_to` and `Load::load_from`,
//! structures spanning several files implement `Deconstruct` and `Reconstruct`
//! and are stored into a directory.
//!
//! # Example
//!
//! ```no_run
//! # use routing_engine::io::*;
//! let levels = Vec::<u32>::load_from("ch/level")?;
//! levels.write_to(&"copy_of_level")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    ffi::OsStr,
    fs::File,
    io::{prelude::*, Error, ErrorKind, Result},
    mem,
    path::Path,
    slice,
};

/// Access to the raw bytes of plain old data.
///
/// Implemented for slices and vectors of `Copy` types.
/// Do not use this trait directly but rather `Store`.
pub trait DataBytes {
    fn data_bytes(&self) -> &[u8];
}

/// Mutable access to the raw bytes of plain old data, so file contents can be read straight into a
/// preallocated object.
///
/// Do not use this trait directly but rather `Load`.
pub trait DataBytesMut {
    fn data_bytes_mut(&mut self) -> &mut [u8];
}

impl<T: Copy> DataBytes for [T] {
    fn data_bytes(&self) -> &[u8] {
        let num_bytes = mem::size_of_val(self);
        unsafe { slice::from_raw_parts(self.as_ptr() as *const u8, num_bytes) }
    }
}

impl<T: Copy> DataBytes for Vec<T> {
    fn data_bytes(&self) -> &[u8] {
        self[..].data_bytes()
    }
}

impl<T: Copy> DataBytesMut for [T] {
    fn data_bytes_mut(&mut self) -> &mut [u8] {
        let num_bytes = mem::size_of_val(self);
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr() as *mut u8, num_bytes) }
    }
}

impl<T: Copy> DataBytesMut for Vec<T> {
    fn data_bytes_mut(&mut self) -> &mut [u8] {
        self[..].data_bytes_mut()
    }
}

/// Writing objects to a single file.
pub trait Store: DataBytes {
    fn write_to(&self, path: &dyn AsRef<Path>) -> Result<()> {
        File::create(path)?.write_all(self.data_bytes())
    }
}

impl<T: DataBytes> Store for T {}
impl<T> Store for [T] where [T]: DataBytes {}

/// Loading objects back from a single file.
pub trait Load: DataBytesMut + Sized {
    /// Allocates an object able to hold `num_bytes` of serialized data.
    /// Fails if no object can have exactly that size.
    fn new_with_bytes(num_bytes: usize) -> Result<Self>;

    fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;
        let num_bytes = file.metadata()?.len() as usize;

        let mut object = Self::new_with_bytes(num_bytes)?;
        file.read_exact(object.data_bytes_mut())?;
        Ok(object)
    }
}

impl<T: Default + Copy> Load for Vec<T> {
    fn new_with_bytes(num_bytes: usize) -> Result<Self> {
        let element_size = mem::size_of::<T>();
        if num_bytes % element_size != 0 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("{} bytes are not a multiple of the element size {}", num_bytes, element_size),
            ));
        }
        Ok(vec![T::default(); num_bytes / element_size])
    }
}

/// Serializing objects which need more than a single file.
pub trait Deconstruct: Sized {
    /// Should call `store_callback` once for each file, passing a file name and the data.
    fn store_each(&self, store_callback: &dyn Fn(&str, &dyn Store) -> Result<()>) -> Result<()>;

    /// Stores the object into the given (existing) directory.
    fn deconstruct_to<D: AsRef<OsStr>>(&self, dir: &D) -> Result<()> {
        let path = Path::new(dir);
        self.store_each(&|name, object: &dyn Store| object.write_to(&path.join(name)))
    }
}

/// Handed to `Reconstruct::reconstruct_with` to load the individual files back.
#[derive(Debug)]
pub struct Loader<'a> {
    path: &'a Path,
}

impl<'a> Loader<'a> {
    /// Loads the file stored under `name` by `store_each`.
    pub fn load<T: Load, P: AsRef<Path>>(&self, name: P) -> Result<T> {
        T::load_from(self.path.join(name))
    }

    /// Like `load` but additionally checks the number of elements.
    pub fn load_vec<T: Default + Copy, P: AsRef<Path>>(&self, name: P, expected_len: usize) -> Result<Vec<T>> {
        let name = name.as_ref();
        let data: Vec<T> = self.load(name)?;
        if data.len() != expected_len {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("{} contains {} elements, expected {}", name.display(), data.len(), expected_len),
            ));
        }
        Ok(data)
    }
}

/// Deserializing objects which need more than a single file.
pub trait Reconstruct: Sized {
    fn reconstruct_with(loader: Loader) -> Result<Self>;

    /// Loads the object from a directory previously written by `Deconstruct::deconstruct_to`.
    fn reconstruct_from<D: AsRef<OsStr>>(dir: &D) -> Result<Self> {
        let path = Path::new(dir);
        Self::reconstruct_with(Loader { path })
    }
}
