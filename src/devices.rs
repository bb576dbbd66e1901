// Framework 16 input-module registry
// Product ids for the backlit modules that fit the FW16 deck

/// Logical slot class a module belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Keyboard,
    Numpad,
    Macropad,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Keyboard,
        Category::Numpad,
        Category::Macropad,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Keyboard => "keyboard",
            Category::Numpad => "numpad",
            Category::Macropad => "macropad",
            Category::Other => "other",
        }
    }
}

/// One known module type
#[derive(Debug, Clone, Copy)]
pub struct ModuleDefinition {
    pub pid: u16,
    pub name: &'static str,
    pub display_name: &'static str,
    pub category: Category,
}

/// Framework Computer vendor id
pub const FRAMEWORK_VID: u16 = 0x32ac;

/// Known FW16 input modules, in probe priority order (keyboards first).
/// Add new modules here as they ship.
pub const SUPPORTED_MODULES: &[ModuleDefinition] = &[
    ModuleDefinition {
        pid: 0x0012,
        name: "kbd_ansi",
        display_name: "Framework 16 Keyboard (ANSI)",
        category: Category::Keyboard,
    },
    ModuleDefinition {
        pid: 0x0018,
        name: "kbd_iso",
        display_name: "Framework 16 Keyboard (ISO)",
        category: Category::Keyboard,
    },
    ModuleDefinition {
        pid: 0x0019,
        name: "kbd_jis",
        display_name: "Framework 16 Keyboard (JIS)",
        category: Category::Keyboard,
    },
    ModuleDefinition {
        pid: 0x0014,
        name: "numpad",
        display_name: "Framework 16 Numpad",
        category: Category::Numpad,
    },
    ModuleDefinition {
        pid: 0x0013,
        name: "macropad",
        display_name: "Framework 16 RGB Macropad",
        category: Category::Macropad,
    },
];

/// Find a module definition by product id
pub fn find_module(pid: u16) -> Option<&'static ModuleDefinition> {
    SUPPORTED_MODULES.iter().find(|m| m.pid == pid)
}

/// Category of a product id; unknown pids (CLI overrides) land in Other
pub fn category_of(pid: u16) -> Category {
    find_module(pid).map(|m| m.category).unwrap_or(Category::Other)
}

/// Human-readable name for logs and --list output
pub fn display_name(pid: u16) -> &'static str {
    find_module(pid)
        .map(|m| m.display_name)
        .unwrap_or("unknown module")
}

/// Product ids to probe, in table order
pub fn probe_pids() -> Vec<u16> {
    SUPPORTED_MODULES.iter().map(|m| m.pid).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_order_keyboards_first() {
        assert_eq!(probe_pids(), vec![0x0012, 0x0018, 0x0019, 0x0014, 0x0013]);
    }

    #[test]
    fn categories() {
        assert_eq!(category_of(0x0012), Category::Keyboard);
        assert_eq!(category_of(0x0018), Category::Keyboard);
        assert_eq!(category_of(0x0019), Category::Keyboard);
        assert_eq!(category_of(0x0014), Category::Numpad);
        assert_eq!(category_of(0x0013), Category::Macropad);
        assert_eq!(category_of(0xbeef), Category::Other);
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name(0x0014), "Framework 16 Numpad");
        assert_eq!(display_name(0xbeef), "unknown module");
    }
}
