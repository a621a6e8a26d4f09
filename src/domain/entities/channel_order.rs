use serde::{Deserialize, Serialize};

/// 並べ替え可能な要素。位置はフィールドではなく配列内の順序で表す。
pub trait OrderedItem {
    type Id: PartialEq;

    fn item_id(&self) -> &Self::Id;
}

/// 並べ替えの状態遷移: `Stable → Reordering → {Stable, Reverting → Stable}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReorderPhase {
    #[default]
    Stable,
    Reordering,
    Reverting,
}

/// ドロップされた要素を、ドロップ先の要素が占めている位置へ移動した新しい並びを返す。
///
/// 位置は適用時に ID から引く。自分自身へのドロップや見つからない ID の場合は元の並びのまま。
/// `[A, B, C, D]` で A を C の位置へ移すと `[B, C, A, D]` になる。
pub fn reconcile_order<T>(items: &[T], moved_id: &T::Id, target_id: &T::Id) -> Vec<T>
where
    T: OrderedItem + Clone,
{
    if moved_id == target_id {
        return items.to_vec();
    }

    let old_index = items.iter().position(|item| item.item_id() == moved_id);
    let new_index = items.iter().position(|item| item.item_id() == target_id);
    let (Some(old_index), Some(new_index)) = (old_index, new_index) else {
        return items.to_vec();
    };

    let mut reordered = items.to_vec();
    let moved = reordered.remove(old_index);
    reordered.insert(new_index, moved);
    reordered
}
