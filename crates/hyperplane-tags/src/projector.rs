//! Virtual tag hierarchy over the home root.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use hyperplane_core::{HyperplaneConfig, OpsError, TagName, TagSet};
use jwalk::{DirEntryIter, Parallelism, WalkDir};

/// One result of a tag enumeration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entry {
    /// A filesystem entry carrying every queried tag.
    Item(PathBuf),
    /// A further tag that narrows the current query.
    Tag(TagName),
}

impl Entry {
    /// The item path, if this is an item.
    pub fn as_item(&self) -> Option<&Path> {
        match self {
            Self::Item(path) => Some(path),
            Self::Tag(_) => None,
        }
    }

    /// The tag name, if this is a tag.
    pub fn as_tag(&self) -> Option<&TagName> {
        match self {
            Self::Item(_) => None,
            Self::Tag(tag) => Some(tag),
        }
    }
}

/// Presents the home root as a tag namespace.
///
/// Tags are the directories directly below home. An entry carries a tag when
/// that tag's directory is one of its ancestors below home, so
/// `home/work/urgent/plan.txt` is tagged both `work` and `urgent`. Nothing is
/// cached: every call re-reads the home root.
#[derive(Debug, Clone)]
pub struct TagProjector {
    home: PathBuf,
}

impl TagProjector {
    /// Create a projector for the home root in `config`.
    pub fn new(config: &HyperplaneConfig) -> Self {
        Self {
            home: config.home.clone(),
        }
    }

    /// The home root.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The names of every directory directly below home. Hidden ones included.
    pub fn list_tags(&self) -> Result<BTreeSet<TagName>, OpsError> {
        let entries = fs::read_dir(&self.home).map_err(|e| OpsError::io(&self.home, e))?;

        Ok(entries
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .map(|entry| TagName::from(entry.file_name().to_string_lossy().into_owned()))
            .collect())
    }

    /// Whether a tag currently exists.
    pub fn tag_exists(&self, tag: &TagName) -> bool {
        self.home.join(tag.as_str()).is_dir()
    }

    /// Parse a `//tag//tag//` path, keeping only tags that exist right now.
    ///
    /// An empty result means none of the named tags exist.
    pub fn resolve_tag_path(&self, text: &str) -> TagSet {
        TagSet::parse(text)
            .iter()
            .filter(|tag| self.tag_exists(tag))
            .cloned()
            .collect()
    }

    /// The home listing: every tag, plus every top-level entry that is not a tag.
    pub fn list_home(&self) -> Result<Vec<Entry>, OpsError> {
        let entries = fs::read_dir(&self.home).map_err(|e| OpsError::io(&self.home, e))?;

        let mut listing: Vec<Entry> = entries
            .flatten()
            .map(|entry| {
                if entry.file_type().is_ok_and(|t| t.is_dir()) {
                    Entry::Tag(TagName::from(entry.file_name().to_string_lossy().into_owned()))
                } else {
                    Entry::Item(entry.path())
                }
            })
            .collect();
        listing.sort();

        Ok(listing)
    }

    /// Enumerate everything tagged with all of `tags`.
    ///
    /// Yields every entry reachable through all of the tag directories, plus
    /// each other non-empty tag directory found along the way (to narrow the
    /// query further). The walk is lazy; call again to restart it against
    /// the current filesystem. An empty query yields nothing.
    pub fn enumerate(&self, tags: &TagSet) -> Result<TagEntries, OpsError> {
        let known: Arc<HashSet<String>> = Arc::new(
            self.list_tags()?
                .into_iter()
                .map(|tag| tag.as_str().to_string())
                .collect(),
        );
        let query: HashSet<String> = tags.iter().map(|tag| tag.as_str().to_string()).collect();

        let home = Arc::new(self.home.clone());
        let walk_home = Arc::clone(&home);
        let walk_known = Arc::clone(&known);

        let walker = WalkDir::new(&self.home)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(1)
            .process_read_dir(move |depth, path, _state, children| {
                // `None` is the read yielding the root itself.
                if depth.is_none() {
                    return;
                }
                let chain = tag_chain(&walk_home, path);
                children.iter_mut().flatten().for_each(|child| {
                    let name = child.file_name().to_string_lossy();
                    let descend = child.file_type().is_dir()
                        && walk_known.contains(&*name)
                        && !chain.contains(&*name);
                    if !descend {
                        child.read_children_path = None;
                    }
                });
            });

        Ok(TagEntries {
            walker: walker.into_iter(),
            home,
            known,
            query,
            offered: HashSet::new(),
        })
    }
}

/// The tag directories between `home` and `dir`, inclusive.
fn tag_chain(home: &Path, dir: &Path) -> HashSet<String> {
    dir.strip_prefix(home)
        .map(|relative| {
            relative
                .components()
                .filter_map(|component| match component {
                    Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Lazy sequence of [`Entry`] values produced by [`TagProjector::enumerate`].
pub struct TagEntries {
    walker: DirEntryIter<((), ())>,
    home: Arc<PathBuf>,
    known: Arc<HashSet<String>>,
    query: HashSet<String>,
    offered: HashSet<String>,
}

impl Iterator for TagEntries {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        if self.query.is_empty() {
            return None;
        }

        for result in self.walker.by_ref() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            let chain = tag_chain(&self.home, &entry.parent_path());
            if !self.query.iter().all(|tag| chain.contains(tag)) {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let is_tag_dir = entry.file_type().is_dir()
                && self.known.contains(&name)
                && !chain.contains(&name);

            if !is_tag_dir {
                return Some(Entry::Item(entry.path()));
            }

            if self.query.contains(&name) || self.offered.contains(&name) {
                continue;
            }
            if is_non_empty_dir(&entry.path()) {
                self.offered.insert(name.clone());
                return Some(Entry::Tag(TagName::from(name)));
            }
        }

        None
    }
}

impl std::fmt::Debug for TagEntries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagEntries")
            .field("home", &self.home)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_some())
}
