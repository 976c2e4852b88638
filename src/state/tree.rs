use std::collections::{HashMap, HashSet};

use crate::error::TreeError;
use crate::state::item::{File, Folder, Item, ItemId};
use crate::state::key_value::next_free_name;
use crate::state::request::RequestDocument;

pub const FOLDER_NAME_PREFIX: &str = "NewFolder";
pub const FILE_NAME_PREFIX: &str = "NewRequest";

/// Flat store of folders and request files linked by parent pointers.
///
/// Items live in one backing sequence; the order of children under a parent is
/// their relative order in that sequence. Child sets, ancestry and cycle checks
/// are always computed from the parent pointers. Every mutating method checks
/// everything it needs before touching state, so an `Err` leaves the tree as it
/// was. The store expects a single writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemTree {
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
}

impl ItemTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from persisted items, rejecting anything that is not a forest.
    pub fn from_items(items: Vec<Item>) -> Result<Self, TreeError> {
        let mut index = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if index.insert(item.id(), pos).is_some() {
                return Err(TreeError::DuplicateId(item.id()));
            }
        }
        let tree = Self { items, index };
        tree.validate()?;
        Ok(tree)
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.index.get(&id).map(|&pos| &self.items[pos])
    }

    pub fn folder(&self, id: ItemId) -> Option<&Folder> {
        self.get(id).and_then(Item::as_folder)
    }

    pub fn file(&self, id: ItemId) -> Option<&File> {
        self.get(id).and_then(Item::as_file)
    }

    pub fn request(&self, id: ItemId) -> Option<&RequestDocument> {
        self.file(id).map(|file| &file.request)
    }

    pub fn request_mut(&mut self, id: ItemId) -> Option<&mut RequestDocument> {
        match self.get_mut(id)? {
            Item::File(file) => Some(&mut file.request),
            Item::Folder(_) => None,
        }
    }

    /// Direct children of `parent` (`None` for the top level), in order.
    pub fn children(&self, parent: Option<ItemId>) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(move |item| item.parent_id() == parent)
    }

    pub fn roots(&self) -> impl Iterator<Item = &Item> {
        self.children(None)
    }

    /// Every item below `id`, depth first, in child order.
    pub fn descendants(&self, id: ItemId) -> Vec<ItemId> {
        let children = self.child_map();
        let mut out = Vec::new();
        let mut stack: Vec<ItemId> = children.get(&Some(id)).cloned().unwrap_or_default();
        stack.reverse();
        let mut seen = HashSet::new();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            if let Some(kids) = children.get(&Some(next)) {
                stack.extend(kids.iter().rev().copied());
            }
        }
        out
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(Item::parent_id);
        while let Some(parent) = current {
            // A chain longer than the tree means a cycle; stop rather than spin.
            if out.len() > self.items.len() {
                break;
            }
            out.push(parent);
            current = self.get(parent).and_then(Item::parent_id);
        }
        out
    }

    pub fn is_descendant(&self, id: ItemId, of: ItemId) -> bool {
        self.ancestors(id).contains(&of)
    }

    /// Names from the top level down to `id` inclusive.
    pub fn path_names(&self, id: ItemId) -> Vec<&str> {
        let Some(item) = self.get(id) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .ancestors(id)
            .into_iter()
            .filter_map(|a| self.get(a).map(Item::name))
            .collect();
        names.reverse();
        names.push(item.name());
        names
    }

    /// Check the forest invariant: unique ids, parents exist and are folders, no cycles.
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.index.len() != self.items.len() {
            let mut seen = HashSet::new();
            for item in &self.items {
                if !seen.insert(item.id()) {
                    return Err(TreeError::DuplicateId(item.id()));
                }
            }
        }
        for item in &self.items {
            if let Some(parent) = item.parent_id() {
                match self.get(parent) {
                    None => return Err(TreeError::MissingParent(parent)),
                    Some(p) if !p.is_folder() => return Err(TreeError::NotAFolder(parent)),
                    Some(_) => {}
                }
            }
        }
        for item in &self.items {
            let mut steps = 0;
            let mut current = item.parent_id();
            while let Some(parent) = current {
                steps += 1;
                if parent == item.id() || steps > self.items.len() {
                    return Err(TreeError::Cycle(item.id()));
                }
                current = self.get(parent).and_then(Item::parent_id);
            }
        }
        Ok(())
    }

    pub fn create_folder(&mut self, parent: Option<ItemId>) -> Result<Folder, TreeError> {
        self.ensure_folder(parent)?;
        let name = next_free_name(
            FOLDER_NAME_PREFIX,
            self.children(parent)
                .filter_map(Item::as_folder)
                .map(|f| f.name.as_str()),
        );
        let folder = Folder::new(name, parent);
        tracing::debug!(event = "tree.create_folder", id = %folder.id, name = %folder.name);
        self.push(Item::Folder(folder.clone()));
        Ok(folder)
    }

    /// Add a request file. A `seed` document keeps its id and, if it has one, its name;
    /// otherwise the file gets a fresh GET request named after the first free
    /// `NewRequest<N>` among sibling files.
    pub fn create_file(
        &mut self,
        parent: Option<ItemId>,
        seed: Option<RequestDocument>,
    ) -> Result<File, TreeError> {
        self.ensure_folder(parent)?;
        let mut request = seed.unwrap_or_default();
        if self.contains(request.id()) {
            return Err(TreeError::DuplicateId(request.id()));
        }
        if request.name().is_empty() {
            let name = next_free_name(
                FILE_NAME_PREFIX,
                self.children(parent)
                    .filter_map(Item::as_file)
                    .map(File::name),
            );
            request.set_name(name);
        }
        let file = File::new(request, parent);
        tracing::debug!(event = "tree.create_file", id = %file.id(), name = %file.name());
        self.push(Item::File(file.clone()));
        Ok(file)
    }

    /// Rename a folder, or rewrite the name of the request a file owns.
    pub fn rename(&mut self, id: ItemId, name: impl Into<String>) -> Result<(), TreeError> {
        let name = name.into();
        tracing::debug!(event = "tree.rename", id = %id, name = %name);
        match self.get_mut(id).ok_or(TreeError::NotFound(id))? {
            Item::Folder(folder) => folder.name = name,
            Item::File(file) => file.request.set_name(name),
        }
        Ok(())
    }

    /// Reposition the children of `parent` to follow `new_order`, which must be a
    /// permutation of their ids. Other items keep their places.
    pub fn reorder_siblings(
        &mut self,
        parent: Option<ItemId>,
        new_order: &[ItemId],
    ) -> Result<(), TreeError> {
        self.ensure_folder(parent)?;
        let slots: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.parent_id() == parent)
            .map(|(pos, _)| pos)
            .collect();
        let current: HashSet<ItemId> = slots.iter().map(|&pos| self.items[pos].id()).collect();
        let proposed: HashSet<ItemId> = new_order.iter().copied().collect();
        if new_order.len() != slots.len() || proposed != current {
            return Err(TreeError::InvalidOrder {
                parent: parent.map_or_else(|| "the top level".to_string(), |p| p.to_string()),
            });
        }

        let mut old: Vec<Option<Item>> =
            std::mem::take(&mut self.items).into_iter().map(Some).collect();
        let mut slot_iter = slots.iter().zip(new_order).peekable();
        let mut reordered = Vec::with_capacity(old.len());
        for pos in 0..old.len() {
            let target = slot_iter.peek().map(|(slot, id)| (**slot, **id));
            let source = match target {
                Some((slot, id)) if slot == pos => {
                    slot_iter.next();
                    self.index[&id]
                }
                _ => pos,
            };
            if let Some(item) = old[source].take() {
                reordered.push(item);
            }
        }
        self.items = reordered;
        self.reindex();
        tracing::debug!(event = "tree.reorder", count = new_order.len());
        Ok(())
    }

    /// Re-parent `ids` under `destination` (`None` for the top level).
    ///
    /// Items that sit below another selected folder are left alone so they travel
    /// with that folder. Moving a folder into itself or its own subtree fails with
    /// [`TreeError::CyclicMove`]. Moved items are placed after their new siblings,
    /// keeping their existing relative order. Returns how many items were re-parented.
    pub fn move_items(
        &mut self,
        ids: impl IntoIterator<Item = ItemId>,
        destination: Option<ItemId>,
    ) -> Result<usize, TreeError> {
        let selected: HashSet<ItemId> = ids.into_iter().collect();
        if let Some(missing) = selected.iter().find(|id| !self.contains(**id)) {
            return Err(TreeError::NotFound(*missing));
        }
        self.ensure_folder(destination)?;

        let selected_folders: Vec<ItemId> = selected
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_some_and(Item::is_folder))
            .collect();

        let to_move: HashSet<ItemId> = selected
            .iter()
            .copied()
            .filter(|id| {
                !selected_folders
                    .iter()
                    .any(|folder| folder != id && self.is_descendant(*id, *folder))
            })
            .collect();

        if let Some(dest) = destination {
            for folder in &selected_folders {
                if dest == *folder || self.is_descendant(dest, *folder) {
                    return Err(TreeError::CyclicMove {
                        folder: *folder,
                        destination: dest,
                    });
                }
            }
        }

        let (mut staying, mut moving): (Vec<Item>, Vec<Item>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| !to_move.contains(&item.id()));
        for item in &mut moving {
            item.set_parent_id(destination);
        }
        staying.append(&mut moving);
        self.items = staying;
        self.reindex();

        tracing::debug!(
            event = "tree.move",
            selected = selected.len(),
            moved = to_move.len(),
            destination = ?destination,
        );
        Ok(to_move.len())
    }

    /// Remove an item. Folders take every descendant with them. Returns the removed
    /// items in tree order.
    pub fn delete(&mut self, id: ItemId) -> Result<Vec<Item>, TreeError> {
        if !self.contains(id) {
            return Err(TreeError::NotFound(id));
        }
        let mut doomed: HashSet<ItemId> = self.descendants(id).into_iter().collect();
        doomed.insert(id);

        let (removed, kept): (Vec<Item>, Vec<Item>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|item| doomed.contains(&item.id()));
        self.items = kept;
        self.reindex();
        tracing::debug!(event = "tree.delete", id = %id, removed = removed.len());
        Ok(removed)
    }

    /// Copy a request file, with new ids, right after the original.
    pub fn duplicate(&mut self, file_id: ItemId) -> Result<File, TreeError> {
        let pos = *self.index.get(&file_id).ok_or(TreeError::NotFound(file_id))?;
        let source = self.items[pos].as_file().ok_or(TreeError::NotAFile(file_id))?;
        let copy = File::new(source.request.duplicate(), source.parent_id);
        tracing::debug!(event = "tree.duplicate", source = %file_id, id = %copy.id());
        self.items.insert(pos + 1, Item::File(copy.clone()));
        self.reindex();
        Ok(copy)
    }

    fn ensure_folder(&self, id: Option<ItemId>) -> Result<(), TreeError> {
        let Some(id) = id else {
            return Ok(());
        };
        match self.get(id) {
            None => Err(TreeError::MissingParent(id)),
            Some(item) if !item.is_folder() => Err(TreeError::NotAFolder(id)),
            Some(_) => Ok(()),
        }
    }

    fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        let pos = *self.index.get(&id)?;
        self.items.get_mut(pos)
    }

    fn push(&mut self, item: Item) {
        self.index.insert(item.id(), self.items.len());
        self.items.push(item);
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(pos, item)| (item.id(), pos))
            .collect();
    }

    fn child_map(&self) -> HashMap<Option<ItemId>, Vec<ItemId>> {
        let mut map: HashMap<Option<ItemId>, Vec<ItemId>> = HashMap::new();
        for item in &self.items {
            map.entry(item.parent_id()).or_default().push(item.id());
        }
        map
    }
}
