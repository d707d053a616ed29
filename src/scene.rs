// scene.rs — 场景元素 (按逻辑角色，而不是按标记)

use std::fmt;
use std::path::PathBuf;

use glam::Vec2;

use crate::item::RingItem;
use crate::transform::ContainerTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    DragContainer,
    SpinContainer,
    Ground,
    RevealTrigger,
    Cover,
    Caption,
    Canvas,
    AudioMount,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::DragContainer => "drag-container",
            Role::SpinContainer => "spin-container",
            Role::Ground => "ground",
            Role::RevealTrigger => "reveal-trigger",
            Role::Cover => "cover",
            Role::Caption => "caption",
            Role::Canvas => "canvas",
            Role::AudioMount => "audio-mount",
        };
        f.write_str(name)
    }
}

/// Visual treatments toggled on scene nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Hidden,
    Open,
    FadeOut,
    RevealZoom,
    Glow,
    AutoSpin,
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    classes: Vec<Class>,
    /// `display: none`
    pub removed: bool,
    /// `pointer-events` enabled
    pub interactive: bool,
    pub size: Option<Vec2>,
    pub transform: Option<ContainerTransform>,
    pub text: Option<String>,
}

impl Node {
    pub fn new() -> Self {
        Self {
            interactive: true,
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class: Class) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn has(&self, class: Class) -> bool {
        self.classes.contains(&class)
    }

    pub fn add_class(&mut self, class: Class) {
        if !self.has(class) {
            self.classes.push(class);
        }
    }

    pub fn remove_class(&mut self, class: Class) {
        self.classes.retain(|c| *c != class);
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    /// Shown on screen: neither removed from layout nor hidden by class.
    pub fn is_visible(&self) -> bool {
        !self.removed && !self.has(Class::Hidden)
    }
}

/// Background audio element placed in the audio mount at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTag {
    pub source: PathBuf,
    pub controls: bool,
    pub looping: bool,
}

/// Every element the engine touches. Absent roles are `None`.
#[derive(Debug, Default)]
pub struct Scene {
    pub drag: Option<Node>,
    pub spin: Option<Node>,
    pub ground: Option<Node>,
    pub trigger: Option<Node>,
    pub cover: Option<Node>,
    pub caption: Option<Node>,
    pub canvas: Option<Node>,
    pub audio_mount: Option<Node>,
    pub audio: Option<AudioTag>,
    pub items: Vec<RingItem>,
}

impl Scene {
    /// Scene with every role present. The carousel starts hidden behind the
    /// cover; `with_gift(false)` drops the cover and its trigger.
    pub fn new(items: Vec<RingItem>) -> Self {
        Self {
            drag: Some(Node::new().with_class(Class::Hidden)),
            spin: Some(Node::new()),
            ground: Some(Node::new()),
            trigger: Some(Node::new()),
            cover: Some(Node::new()),
            caption: Some(Node::new()),
            canvas: Some(Node::new()),
            audio_mount: Some(Node::new()),
            audio: None,
            items,
        }
    }

    pub fn with_gift(mut self, gift: bool) -> Self {
        if !gift {
            self.trigger = None;
            self.cover = None;
        }
        self
    }

    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption.map(|text| Node::new().with_text(text));
        self
    }

    pub fn node(&self, role: Role) -> Option<&Node> {
        match role {
            Role::DragContainer => self.drag.as_ref(),
            Role::SpinContainer => self.spin.as_ref(),
            Role::Ground => self.ground.as_ref(),
            Role::RevealTrigger => self.trigger.as_ref(),
            Role::Cover => self.cover.as_ref(),
            Role::Caption => self.caption.as_ref(),
            Role::Canvas => self.canvas.as_ref(),
            Role::AudioMount => self.audio_mount.as_ref(),
        }
    }

    pub fn node_mut(&mut self, role: Role) -> Option<&mut Node> {
        match role {
            Role::DragContainer => self.drag.as_mut(),
            Role::SpinContainer => self.spin.as_mut(),
            Role::Ground => self.ground.as_mut(),
            Role::RevealTrigger => self.trigger.as_mut(),
            Role::Cover => self.cover.as_mut(),
            Role::Caption => self.caption.as_mut(),
            Role::Canvas => self.canvas.as_mut(),
            Role::AudioMount => self.audio_mount.as_mut(),
        }
    }

    /// Node that receives the composed rotation. Needs both containers.
    pub fn motion_target(&mut self) -> Option<&mut Node> {
        self.drag.as_ref()?;
        self.spin.as_mut()
    }

    /// Whether the gift reveal can run at all.
    pub fn has_reveal(&self) -> bool {
        self.trigger.is_some() && self.cover.is_some() && self.drag.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_a_set() {
        let mut node = Node::new();
        node.add_class(Class::Glow);
        node.add_class(Class::Glow);
        assert_eq!(node.classes(), &[Class::Glow]);
        node.remove_class(Class::Glow);
        assert!(node.classes().is_empty());
    }

    #[test]
    fn motion_target_requires_both_containers() {
        let mut scene = Scene::new(Vec::new());
        assert!(scene.motion_target().is_some());
        scene.drag = None;
        assert!(scene.motion_target().is_none());
    }

    #[test]
    fn gift_flag_controls_reveal_path() {
        assert!(Scene::new(Vec::new()).has_reveal());
        assert!(!Scene::new(Vec::new()).with_gift(false).has_reveal());
    }
}
