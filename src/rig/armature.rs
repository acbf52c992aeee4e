use anyhow::{bail, Result};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

/// リグ上のノード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// 回転を書き換えられる外部のボーン階層
///
/// ノードの所有はリグ側にあり、リターゲッタは `NodeId` で参照するだけ。
pub trait Armature {
    fn node_count(&self) -> usize;

    fn world_position(&self, node: NodeId) -> Point3<f32>;

    fn world_rotation(&self, node: NodeId) -> UnitQuaternion<f32>;

    fn local_rotation(&self, node: NodeId) -> UnitQuaternion<f32>;

    fn set_local_rotation(&mut self, node: NodeId, rotation: UnitQuaternion<f32>);

    /// ノード空間の方向をワールド空間へ
    fn transform_direction(&self, node: NodeId, direction: &Vector3<f32>) -> Vector3<f32> {
        self.world_rotation(node) * direction
    }

    /// ワールド空間の方向をノード空間へ
    fn inverse_transform_direction(&self, node: NodeId, direction: &Vector3<f32>) -> Vector3<f32> {
        self.world_rotation(node).inverse_transform_vector(direction)
    }
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    local: Isometry3<f32>,
    world: Isometry3<f32>,
}

/// 親子関係を持つノードの木（スケール無し）
///
/// ノードは親より後に追加されるので、追加順に辿ればワールド姿勢を更新できる。
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    nodes: Vec<Node>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_root(&mut self, name: impl Into<String>, position: Point3<f32>) -> NodeId {
        let local = Isometry3::from_parts(Translation3::from(position.coords), UnitQuaternion::identity());
        self.push(name.into(), None, local)
    }

    /// `position` は親ノード空間での位置
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        position: Point3<f32>,
    ) -> Result<NodeId> {
        if parent.0 >= self.nodes.len() {
            bail!("Parent node {} out of bounds for {} nodes", parent.0, self.nodes.len());
        }
        let local = Isometry3::from_parts(Translation3::from(position.coords), UnitQuaternion::identity());
        Ok(self.push(name.into(), Some(parent), local))
    }

    /// ワールド位置を指定して子ノードを追加する（親の現在の姿勢から逆算）
    pub fn add_child_at(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        world_position: Point3<f32>,
    ) -> Result<NodeId> {
        let Some(parent_node) = self.nodes.get(parent.0) else {
            bail!("Parent node {} out of bounds for {} nodes", parent.0, self.nodes.len());
        };
        let local_position = parent_node.world.inverse_transform_point(&world_position);
        self.add_child(parent, name, local_position)
    }

    fn push(&mut self, name: String, parent: Option<NodeId>, local: Isometry3<f32>) -> NodeId {
        let world = match parent {
            Some(p) => self.nodes[p.0].world * local,
            None => local,
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            parent,
            local,
            world,
        });
        id
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// `start` 以降のノードのワールド姿勢を更新する
    fn update_world_from(&mut self, start: NodeId) {
        for i in start.0..self.nodes.len() {
            let world = match self.nodes[i].parent {
                Some(p) => self.nodes[p.0].world * self.nodes[i].local,
                None => self.nodes[i].local,
            };
            self.nodes[i].world = world;
        }
    }
}

impl Armature for Hierarchy {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn world_position(&self, node: NodeId) -> Point3<f32> {
        Point3::from(self.nodes[node.0].world.translation.vector)
    }

    fn world_rotation(&self, node: NodeId) -> UnitQuaternion<f32> {
        self.nodes[node.0].world.rotation
    }

    fn local_rotation(&self, node: NodeId) -> UnitQuaternion<f32> {
        self.nodes[node.0].local.rotation
    }

    fn set_local_rotation(&mut self, node: NodeId, rotation: UnitQuaternion<f32>) {
        self.nodes[node.0].local.rotation = rotation;
        self.update_world_from(node);
    }
}
