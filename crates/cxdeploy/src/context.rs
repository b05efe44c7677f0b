//! Isolated execution context for one deployment run.

use crate::classpath::ArtifactClasspath;
use crate::error::TypeError;
use crate::resolve::{DescriptorResolver, LoadedType, TypeResolver};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::rc::Rc;

thread_local! {
    static CURRENT: RefCell<Option<Rc<ExecutionContext>>> = const { RefCell::new(None) };
}

/// Classpath, output root and type resolver of one run.
///
/// Owned by the run and shared with `Rc`. Nothing in it outlives the run or
/// touches the resolution state of the process that created it.
pub struct ExecutionContext {
    classpath: ArtifactClasspath,
    output_root: PathBuf,
    resolver: Box<dyn TypeResolver>,
}

impl ExecutionContext {
    pub fn new(
        classpath: ArtifactClasspath,
        output_root: impl Into<PathBuf>,
        resolver: Box<dyn TypeResolver>,
    ) -> Self {
        Self {
            classpath,
            output_root: output_root.into(),
            resolver,
        }
    }

    /// Context resolving types from `.type.json`-style descriptors on `classpath`.
    pub fn with_descriptors(
        classpath: ArtifactClasspath,
        output_root: impl Into<PathBuf>,
        type_suffix: &str,
    ) -> Self {
        let resolver = DescriptorResolver::new(classpath.clone(), type_suffix);
        Self::new(classpath, output_root, Box::new(resolver))
    }

    pub fn classpath(&self) -> &ArtifactClasspath {
        &self.classpath
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn resolve(&self, name: &str) -> Result<Option<Rc<dyn LoadedType>>, TypeError> {
        self.resolver.resolve(name)
    }

    /// Lazily list the regular files directly inside `rel_dir` under the
    /// output root, sorted by file name.
    ///
    /// Returns `None` when the directory does not exist.
    pub fn list_files(&self, rel_dir: &Path) -> Option<FileListing> {
        let dir = self.output_root.join(rel_dir);
        if !dir.is_dir() {
            return None;
        }
        let inner = walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();
        Some(FileListing { inner })
    }

    /// The context installed on this thread by [`ExecutionContext::enter`].
    pub fn current() -> Option<Rc<ExecutionContext>> {
        CURRENT.with(|slot| slot.borrow().clone())
    }

    /// Install this context as current until the returned scope is dropped.
    pub fn enter(self: &Rc<Self>) -> ContextScope {
        let previous = CURRENT.with(|slot| slot.borrow_mut().replace(Rc::clone(self)));
        ContextScope {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("output_root", &self.output_root)
            .field("classpath", &self.classpath)
            .finish()
    }
}

/// Restores the previously current context when dropped.
#[must_use = "the context is only current while the scope is alive"]
pub struct ContextScope {
    previous: Option<Rc<ExecutionContext>>,
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Files of one directory, yielded one at a time.
pub struct FileListing {
    inner: walkdir::IntoIter,
}

impl Iterator for FileListing {
    type Item = Result<PathBuf, walkdir::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(entry) if entry.file_type().is_file() => return Some(Ok(entry.into_path())),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
