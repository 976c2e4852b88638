use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::request::RequestDocument;

pub type ItemId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
}

impl Folder {
    pub fn new(name: impl Into<String>, parent_id: Option<ItemId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parent_id,
        }
    }
}

/// A saved request. Its id is the id of the request it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub request: RequestDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
}

impl File {
    pub fn new(request: RequestDocument, parent_id: Option<ItemId>) -> Self {
        Self { request, parent_id }
    }

    pub fn id(&self) -> ItemId {
        self.request.id()
    }

    pub fn name(&self) -> &str {
        self.request.name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Item {
    Folder(Folder),
    File(File),
}

impl Item {
    pub fn id(&self) -> ItemId {
        match self {
            Item::Folder(folder) => folder.id,
            Item::File(file) => file.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Item::Folder(folder) => &folder.name,
            Item::File(file) => file.name(),
        }
    }

    pub fn parent_id(&self) -> Option<ItemId> {
        match self {
            Item::Folder(folder) => folder.parent_id,
            Item::File(file) => file.parent_id,
        }
    }

    pub(crate) fn set_parent_id(&mut self, parent_id: Option<ItemId>) {
        match self {
            Item::Folder(folder) => folder.parent_id = parent_id,
            Item::File(file) => file.parent_id = parent_id,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Item::Folder(_))
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Item::Folder(folder) => Some(folder),
            Item::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Item::File(file) => Some(file),
            Item::Folder(_) => None,
        }
    }
}

impl From<Folder> for Item {
    fn from(folder: Folder) -> Self {
        Item::Folder(folder)
    }
}

impl From<File> for Item {
    fn from(file: File) -> Self {
        Item::File(file)
    }
}
