//! Seek 索引.
//!
//! 对标 FFmpeg 的 `AVIndexEntry` / `av_add_index_entry` /
//! `av_index_search_timestamp`. 解封装器在读取过程中记录 (字节偏移, 时间戳,
//! 剩余负载) 三元组, 之后 seek 时可以直接恢复到这些边界.

/// 索引条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// 在容器中的字节偏移
    pub pos: u64,
    /// 时间戳 (以流的 time_base 为单位)
    pub timestamp: i64,
    /// 格式相关的大小信息 (VOC: 该位置处当前数据块尚未输出的负载字节数)
    pub size: u64,
    /// 是否为关键帧
    pub is_keyframe: bool,
}

/// 按时间戳升序排列的索引
#[derive(Debug, Clone, Default)]
pub struct StreamIndex {
    entries: Vec<IndexEntry>,
}

impl StreamIndex {
    /// 添加索引条目
    ///
    /// 已存在相同时间戳的条目时用新条目替换.
    pub fn add(&mut self, entry: IndexEntry) {
        match self
            .entries
            .binary_search_by_key(&entry.timestamp, |e| e.timestamp)
        {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// 查找时间戳对应的条目下标
    ///
    /// - `backward = true`: 时间戳不大于目标的最后一个条目
    /// - `backward = false`: 时间戳不小于目标的第一个条目
    pub fn search(&self, timestamp: i64, backward: bool) -> Option<usize> {
        let after = self.entries.partition_point(|e| e.timestamp <= timestamp);
        if backward {
            after.checked_sub(1)
        } else {
            let first_ge = self.entries.partition_point(|e| e.timestamp < timestamp);
            (first_ge < self.entries.len()).then_some(first_ge)
        }
    }

    /// 按下标获取条目
    pub fn get(&self, i: usize) -> Option<&IndexEntry> {
        self.entries.get(i)
    }

    /// 第一个条目
    pub fn first(&self) -> Option<&IndexEntry> {
        self.entries.first()
    }

    /// 最后一个条目
    pub fn last(&self) -> Option<&IndexEntry> {
        self.entries.last()
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有条目
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pos: u64, timestamp: i64) -> IndexEntry {
        IndexEntry {
            pos,
            timestamp,
            size: 0,
            is_keyframe: true,
        }
    }

    #[test]
    fn test_添加保持有序并替换重复时间戳() {
        let mut index = StreamIndex::default();
        index.add(entry(300, 2048));
        index.add(entry(26, 0));
        index.add(entry(100, 1024));
        index.add(entry(110, 1024));
        let stamps: Vec<i64> = index.entries().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![0, 1024, 2048]);
        assert_eq!(index.get(1).unwrap().pos, 110);
    }

    #[test]
    fn test_向前向后查找() {
        let mut index = StreamIndex::default();
        for (i, ts) in [0i64, 1000, 2000].iter().enumerate() {
            index.add(entry(i as u64 * 10, *ts));
        }
        assert_eq!(index.search(1500, true), Some(1));
        assert_eq!(index.search(1500, false), Some(2));
        assert_eq!(index.search(1000, true), Some(1));
        assert_eq!(index.search(1000, false), Some(1));
        assert_eq!(index.search(-1, true), None);
        assert_eq!(index.search(2500, false), None);
        assert_eq!(index.search(2500, true), Some(2));
    }
}
