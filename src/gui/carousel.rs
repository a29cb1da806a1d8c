//! Media preview carousel: index, swipe tracking and slide animation state.
//! Rendering is left to the view layer; this is only the state machine.

/// Minimum horizontal travel that counts as a swipe.
pub const SWIPE_DISTANCE_PX: f32 = 50.0;
/// A shorter flick still navigates when released at least this fast.
pub const SWIPE_VELOCITY_PX_PER_MS: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    Document,
}

impl AttachmentKind {
    /// Guess from a file name or URL extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "avif" | "svg" => AttachmentKind::Image,
            "mp4" | "webm" | "mov" | "m4v" => AttachmentKind::Video,
            "mp3" | "wav" | "ogg" | "m4a" => AttachmentKind::Audio,
            _ => AttachmentKind::Document,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub kind: AttachmentKind,
    pub name: Option<String>,
}

impl Attachment {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            kind: AttachmentKind::from_path(&url),
            url,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    Next,
    Previous,
    GoTo(usize),
    TouchStart { x: f32, at_ms: f64 },
    TouchMove { x: f32 },
    TouchEnd { x: f32, at_ms: f64 },
    Key(Key),
    AnimationFinished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Touch {
    start_x: f32,
    started_at_ms: f64,
    delta_x: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slide {
    pub direction: Direction,
    /// Release speed carried into the slide, px/ms. Zero for clicks and keys.
    pub velocity: f32,
}

/// What the view should do after an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    None,
    Animate(Slide),
    /// Snap back to the current slide after a too-short drag.
    Settle,
    Close,
}

#[derive(Debug, Clone)]
pub struct CarouselState {
    attachments: Vec<Attachment>,
    index: usize,
    touch: Option<Touch>,
    animating: Option<Slide>,
}

impl CarouselState {
    pub fn new(attachments: Vec<Attachment>) -> Self {
        Self {
            attachments,
            index: 0,
            touch: None,
            animating: None,
        }
    }

    pub fn starting_at(attachments: Vec<Attachment>, index: usize) -> Self {
        let mut state = Self::new(attachments);
        state.index = index.min(state.attachments.len().saturating_sub(1));
        state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    pub fn current(&self) -> Option<&Attachment> {
        self.attachments.get(self.index)
    }

    pub fn is_animating(&self) -> bool {
        self.animating.is_some()
    }

    /// Live drag offset for the view to translate the current slide by.
    pub fn drag_offset(&self) -> f32 {
        self.touch.map(|t| t.delta_x).unwrap_or(0.0)
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.attachments.len()
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn update(&mut self, message: Message) -> Effect {
        match message {
            Message::Next => self.step(Direction::Forward, 0.0),
            Message::Previous => self.step(Direction::Backward, 0.0),
            Message::GoTo(target) => self.go_to(target),
            Message::Key(Key::ArrowRight) => self.step(Direction::Forward, 0.0),
            Message::Key(Key::ArrowLeft) => self.step(Direction::Backward, 0.0),
            Message::Key(Key::Escape) => Effect::Close,
            Message::TouchStart { x, at_ms } => {
                if self.animating.is_none() {
                    self.touch = Some(Touch {
                        start_x: x,
                        started_at_ms: at_ms,
                        delta_x: 0.0,
                    });
                }
                Effect::None
            }
            Message::TouchMove { x } => {
                if let Some(touch) = &mut self.touch {
                    touch.delta_x = x - touch.start_x;
                }
                Effect::None
            }
            Message::TouchEnd { x, at_ms } => self.release(x, at_ms),
            Message::AnimationFinished => {
                self.animating = None;
                Effect::None
            }
        }
    }

    fn release(&mut self, x: f32, at_ms: f64) -> Effect {
        let Some(touch) = self.touch.take() else {
            return Effect::None;
        };
        let delta = x - touch.start_x;
        let elapsed = (at_ms - touch.started_at_ms).max(1.0) as f32;
        let velocity = delta.abs() / elapsed;
        if delta.abs() < SWIPE_DISTANCE_PX && velocity < SWIPE_VELOCITY_PX_PER_MS {
            return Effect::Settle;
        }
        // Dragging left reveals the next slide.
        let direction = if delta < 0.0 {
            Direction::Forward
        } else {
            Direction::Backward
        };
        match self.step(direction, velocity) {
            Effect::None => Effect::Settle,
            effect => effect,
        }
    }

    fn step(&mut self, direction: Direction, velocity: f32) -> Effect {
        let target = match direction {
            Direction::Forward if self.has_next() => self.index + 1,
            Direction::Backward if self.has_previous() => self.index - 1,
            _ => return Effect::None,
        };
        self.slide_to(target, direction, velocity)
    }

    fn go_to(&mut self, target: usize) -> Effect {
        if target >= self.attachments.len() || target == self.index {
            return Effect::None;
        }
        let direction = if target > self.index {
            Direction::Forward
        } else {
            Direction::Backward
        };
        self.slide_to(target, direction, 0.0)
    }

    fn slide_to(&mut self, target: usize, direction: Direction, velocity: f32) -> Effect {
        if self.animating.is_some() {
            return Effect::None;
        }
        let slide = Slide {
            direction,
            velocity,
        };
        self.index = target;
        self.touch = None;
        self.animating = Some(slide);
        Effect::Animate(slide)
    }
}
