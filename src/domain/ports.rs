use crate::domain::model::{EntityId, ItemKind, PriceQuote};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The row-like form context the engine drives: a flat namespace of field
/// names to text values, owned by the surrounding page/form. All the engine
/// ever does to it is read fields and write fields back.
pub trait FieldStore: Send + Sync {
    fn read_field(&self, name: &str) -> Option<String>;

    /// Write a value into a named field. Returns `false` when the field no
    /// longer exists (e.g. its row was removed mid-lookup); callers discard
    /// the write silently in that case.
    fn write_field(&self, name: &str, value: &str) -> bool;

    fn field_names(&self) -> Vec<String>;
}

/// Snapshot I/O for the CLI (form state in, reconciled form state out).
pub trait SnapshotStore: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Remote price lookup collaborator. One request per resolution, no retry,
/// no fallback price.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn price_of(&self, kind: ItemKind, id: &EntityId) -> Result<PriceQuote>;
}
