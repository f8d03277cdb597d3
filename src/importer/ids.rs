use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Category,
    SubCategory,
    Bookmark,
}

impl EntityKind {
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Category => "cat",
            EntityKind::SubCategory => "sub",
            EntityKind::Bookmark => "bm",
        }
    }
}

/// Source of identifiers for synthesized records.
///
/// Ids only have to be unique within the output of one import call; the library merge
/// re-keys anything that collides with stored data.
pub trait IdGenerator {
    fn next_id(&mut self, kind: EntityKind) -> String;
}

impl<F> IdGenerator for F
where
    F: FnMut(EntityKind) -> String,
{
    fn next_id(&mut self, kind: EntityKind) -> String {
        self(kind)
    }
}

/// Random v4 UUIDs, used for anything that gets persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self, _kind: EntityKind) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `cat-1`, `sub-1`, `bm-1`, ... with one counter per kind.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    categories: u64,
    sub_categories: u64,
    bookmarks: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, kind: EntityKind) -> String {
        let counter = match kind {
            EntityKind::Category => &mut self.categories,
            EntityKind::SubCategory => &mut self.sub_categories,
            EntityKind::Bookmark => &mut self.bookmarks,
        };
        *counter += 1;
        format!("{}-{}", kind.prefix(), counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_per_kind() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.next_id(EntityKind::Category), "cat-1");
        assert_eq!(ids.next_id(EntityKind::Bookmark), "bm-1");
        assert_eq!(ids.next_id(EntityKind::Category), "cat-2");
        assert_eq!(ids.next_id(EntityKind::SubCategory), "sub-1");
    }

    #[test]
    fn closures_act_as_generators() {
        let mut n = 0;
        let mut ids = |kind: EntityKind| {
            n += 1;
            format!("{}{n}", kind.prefix())
        };
        assert_eq!(ids.next_id(EntityKind::Bookmark), "bm1");
        assert_eq!(ids.next_id(EntityKind::Bookmark), "bm2");
    }

    #[test]
    fn uuid_ids_do_not_repeat() {
        let mut ids = UuidIds;
        let first = ids.next_id(EntityKind::Category);
        let second = ids.next_id(EntityKind::Category);
        assert_ne!(first, second);
    }
}
