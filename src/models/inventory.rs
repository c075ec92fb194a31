use crate::error::EngageError;
use crate::models::{common::InterceptorId, interceptor::Interceptor};

/// 迎撃ミサイルのインベントリ
///
/// 挿入順（取得順）を保持します。インベントリ内の迎撃ミサイルは未発射であり、
/// 発射済みの迎撃ミサイルは二度とインベントリに戻りません。
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    interceptors: Vec<Interceptor>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 末尾に追加
    ///
    /// 発射済みの迎撃ミサイルは追加できません。
    pub fn add(&mut self, interceptor: Interceptor) -> Result<(), EngageError> {
        if interceptor.is_launched() {
            return Err(EngageError::AlreadyLaunched(interceptor.id));
        }
        self.interceptors.push(interceptor);
        Ok(())
    }

    /// IDで検索（最初に一致したもの）
    pub fn find(&self, id: InterceptorId) -> Option<&Interceptor> {
        self.interceptors.iter().find(|i| i.id == id)
    }

    pub fn find_mut(&mut self, id: InterceptorId) -> Option<&mut Interceptor> {
        self.interceptors.iter_mut().find(|i| i.id == id)
    }

    /// IDで取り出す（最初に一致したもの）
    pub fn take(&mut self, id: InterceptorId) -> Option<Interceptor> {
        let index = self.interceptors.iter().position(|i| i.id == id)?;
        Some(self.interceptors.remove(index))
    }

    /// IDで削除し、削除できたかを返す
    pub fn remove(&mut self, id: InterceptorId) -> bool {
        self.take(id).is_some()
    }

    /// 先頭（最も古く取得した）迎撃ミサイル
    pub fn front(&self) -> Option<&Interceptor> {
        self.interceptors.first()
    }

    /// 最も速い迎撃ミサイル（同速の場合は先に見つかったもの）
    pub fn fastest(&self) -> Option<&Interceptor> {
        self.interceptors.iter().fold(None, |best: Option<&Interceptor>, candidate| match best {
            Some(current) if current.speed >= candidate.speed => Some(current),
            _ => Some(candidate),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interceptor> {
        self.interceptors.iter()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}
