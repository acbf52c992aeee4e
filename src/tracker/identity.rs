use tracing::debug;

use crate::skeleton::MAX_TRACKED;

/// 論理プレイヤー (0, 1) とセンサーのスケルトンスロットの対応付け
///
/// 前フレームの割り当てをできるだけ保ち、プレイヤーの入れ替わりを避ける。
/// センサーの追跡IDではなくスロット番号で追跡するため、同一フレーム内で
/// 2人のスロットが入れ替わると取り違える。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityTracker {
    players: [Option<usize>; MAX_TRACKED],
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn players(&self) -> [Option<usize>; MAX_TRACKED] {
        self.players
    }

    pub fn player(&self, index: usize) -> Option<usize> {
        self.players.get(index).copied().flatten()
    }

    pub fn reset(&mut self) {
        self.players = [None; MAX_TRACKED];
    }

    /// 今フレームの追跡中スロット（スロット順）から割り当てを更新する
    pub fn assign(&mut self, tracked: &[usize]) -> [Option<usize>; MAX_TRACKED] {
        if tracked.len() > MAX_TRACKED {
            debug!(count = tracked.len(), "more tracked skeletons than players; ignoring extras");
        }

        self.players = match *tracked {
            [] => [None, None],
            [slot] => self.assign_one(slot),
            [first, second, ..] => self.assign_two(first, second),
        };
        self.players
    }

    fn assign_one(&self, slot: usize) -> [Option<usize>; MAX_TRACKED] {
        match self.players {
            // 前フレームは誰もいない: プレイヤー0へ
            [None, None] => [Some(slot), None],
            // 前フレームは1人: 同じ人なら位置を保ち、別人なら空いている方へ
            [Some(p0), None] => {
                if p0 == slot {
                    [Some(p0), None]
                } else {
                    [None, Some(slot)]
                }
            }
            [None, Some(p1)] => {
                if p1 == slot {
                    [None, Some(p1)]
                } else {
                    [Some(slot), None]
                }
            }
            // 前フレームは2人: 残った方を保つ
            [Some(p0), Some(p1)] => {
                if slot == p0 {
                    [Some(p0), None]
                } else if slot == p1 {
                    [None, Some(p1)]
                } else {
                    [Some(slot), None]
                }
            }
        }
    }

    fn assign_two(&self, first: usize, second: usize) -> [Option<usize>; MAX_TRACKED] {
        let in_order = [Some(first), Some(second)];
        let swapped = [Some(second), Some(first)];

        match self.players {
            [None, None] => in_order,
            // 前フレームの1人が今フレームの何番目に来ても同じプレイヤーに残す
            [None, Some(p1)] => {
                if p1 == first {
                    swapped
                } else {
                    in_order
                }
            }
            [Some(p0), None] => {
                if p0 == second {
                    swapped
                } else {
                    in_order
                }
            }
            [Some(p0), Some(p1)] => {
                if p0 == second || p1 == first {
                    swapped
                } else {
                    in_order
                }
            }
        }
    }
}
