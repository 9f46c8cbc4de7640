// ==========================================
// 影评平台 - 数据清洗器
// ==========================================
// 职责: 空值标准化（空串/空白 → NULL）
// ==========================================

pub struct DataCleaner;

impl DataCleaner {
    /// 标准化 NULL 值（空字符串/空白 → None）
    pub fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }
}
