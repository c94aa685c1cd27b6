//! Domain identifiers (strongly-typed IDs).
//!
//! # 外部 ID と内部 ID
//! - **Key<T>**: ブローカーやワーカーが払い出す不透明な文字列 ID
//!   （job id, worker address, project id, platform id）
//! - **RequestId**: dispatch ごとに courier 自身が採番する ULID
//!
//! ## Phantom Type パターン
//! `Key<T>` は中身が同じ `String` でも、`T` によって別の型になります。
//! JobId を WorkerAddress の位置に渡すようなミスはコンパイルで弾かれます。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// KeyMarker は各 ID 型のマーカー trait
///
/// ログに出すときのラベル（"job", "worker" など）を提供します。
pub trait KeyMarker: Send + Sync + 'static {
    fn label() -> &'static str;
}

/// 外部から渡される不透明な ID
///
/// 値の形式は検査しません。ブローカーが採番したものをそのまま運びます。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key<T: KeyMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: KeyMarker> Key<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// マーカーのラベル（例: "worker"）
    pub fn label(&self) -> &'static str {
        T::label()
    }
}

impl<T: KeyMarker> From<&str> for Key<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: KeyMarker> From<String> for Key<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: KeyMarker> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {}

impl KeyMarker for Job {
    fn label() -> &'static str {
        "job"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Worker {}

impl KeyMarker for Worker {
    fn label() -> &'static str {
        "worker"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Project {}

impl KeyMarker for Project {
    fn label() -> &'static str {
        "project"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {}

impl KeyMarker for Platform {
    fn label() -> &'static str {
        "platform"
    }
}

/// Identifier of a dequeued job (assigned by the broker).
pub type JobId = Key<Job>;

/// Address of a remote execution worker.
pub type WorkerAddress = Key<Worker>;

/// Identifier of the project that owns a job.
pub type ProjectId = Key<Project>;

/// Identifier of the platform that owns a project.
pub type PlatformId = Key<Platform>;

/// Correlation id of one dispatch request.
///
/// 同じ job id が再試行で何度も dispatch されうるため、
/// ack の突き合わせは job id ではなくこの ID で行います。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Ulid);

impl RequestId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for RequestId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_keep_the_raw_value() {
        let job = JobId::new("8f1c2");
        let worker: WorkerAddress = "machine-1".into();

        assert_eq!(job.as_str(), "8f1c2");
        assert_eq!(worker.to_string(), "machine-1");
        assert_eq!(job.label(), "job");
        assert_eq!(worker.label(), "worker");

        // let _: WorkerAddress = job; // <- does not compile
    }

    #[test]
    fn keys_serialize_as_plain_strings() {
        let project = ProjectId::new("proj-1");
        let s = serde_json::to_string(&project).unwrap();
        assert_eq!(s, "\"proj-1\"");

        let back: ProjectId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, project);
    }

    #[test]
    fn request_ids_are_prefixed_and_ordered() {
        let first = RequestId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = RequestId::from_ulid(Ulid::new());

        assert!(first.to_string().starts_with("req-"));
        assert!(first < second);
    }
}
