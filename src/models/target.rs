use crate::models::common::{Position3D, TargetId};

/// 防護対象（都市・施設）
///
/// セッション中は静的で、コアからは読み取り専用です。
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectedTarget {
    /// 安定した識別子（脅威との対応付けに使用）
    pub id: TargetId,
    pub name: String,
    pub position: Position3D,
}

impl ProtectedTarget {
    pub fn new(id: TargetId, name: impl Into<String>, position: Position3D) -> Self {
        Self {
            id,
            name: name.into(),
            position,
        }
    }
}

/// 識別子で防護対象を検索
pub fn find_by_id(targets: &[ProtectedTarget], id: TargetId) -> Option<&ProtectedTarget> {
    targets.iter().find(|t| t.id == id)
}

/// 位置の完全一致で防護対象を検索
pub fn find_by_position<'a>(
    targets: &'a [ProtectedTarget],
    position: &Position3D,
) -> Option<&'a ProtectedTarget> {
    targets.iter().find(|t| t.position == *position)
}
