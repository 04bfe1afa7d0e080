use crate::bitmap::PixelKind;

/// Handle of a renderer inside a [`Manager`](crate::manager::Manager).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RendererId(pub(crate) usize);

impl RendererId {
    /// Registration index of the renderer.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle of an input port: owning renderer plus declaration index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputId {
    pub(crate) renderer: RendererId,
    pub(crate) index: usize,
}

/// Handle of an output port: owning renderer plus declaration index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId {
    pub(crate) renderer: RendererId,
    pub(crate) index: usize,
}

impl InputId {
    pub fn renderer(self) -> RendererId {
        self.renderer
    }

    pub fn index(self) -> usize {
        self.index
    }
}

impl OutputId {
    pub fn renderer(self) -> RendererId {
        self.renderer
    }

    pub fn index(self) -> usize {
        self.index
    }
}

/// A named, typed endpoint. Inputs and outputs share this representation;
/// direction is given by which list of the renderer holds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Port {
    name: String,
    kind: PixelKind,
}

impl Port {
    pub(crate) fn new(name: &str, kind: PixelKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PixelKind {
        self.kind
    }

    /// Whether this port, used as an output, may feed `input`. No conversion
    /// between pixel kinds ever happens, so only equal kinds are compatible.
    pub fn can_feed(&self, input: &Port) -> bool {
        self.kind == input.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_matching_kinds_are_compatible() {
        let ind_out = Port::new("o", PixelKind::Indexed);
        let rgb_out = Port::new("o", PixelKind::Rgb);
        let ind_in = Port::new("i", PixelKind::Indexed);
        let rgb_in = Port::new("i", PixelKind::Rgb);

        assert!(ind_out.can_feed(&ind_in));
        assert!(rgb_out.can_feed(&rgb_in));
        assert!(!ind_out.can_feed(&rgb_in));
        assert!(!rgb_out.can_feed(&ind_in));
    }
}
