// Built-in entity and field tables
//
// `the mouseH` names an entity with no id; `the locH of sprite 3` names field
// `locH` of entity `sprite`, whose id is compiled as an expression.

use crate::lingo_compiler::symbols::fold_name;
use std::collections::HashMap;

/// `(entityCode, fieldCode)` for a built-in property access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub entity: u32,
    pub field: u32,
}

/// `the field of object` where `object` is a script-level name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectFieldRef {
    pub object: String,
    pub field: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityInfo {
    pub code: u32,
    /// Takes a dynamic id (`sprite 3`, `cast "logo"`)
    pub takes_id: bool,
}

/// Field code used for entities accessed without a field (`the mouseH`)
pub const NO_FIELD: u32 = 0;

const ID_ENTITIES: &[&str] = &["sprite", "cast", "window", "field", "castMember", "menuItem"];

const PLAIN_ENTITIES: &[&str] = &[
    "mouseH",
    "mouseV",
    "mouseDown",
    "mouseUp",
    "mouseCast",
    "clickOn",
    "clickLoc",
    "frame",
    "movie",
    "moviePath",
    "pathName",
    "ticks",
    "timer",
    "time",
    "date",
    "key",
    "keyCode",
    "lastClick",
    "lastEvent",
    "lastKey",
    "lastRoll",
    "commandDown",
    "controlDown",
    "optionDown",
    "shiftDown",
    "stageColor",
    "perFrameHook",
    "floatPrecision",
    "colorDepth",
    "soundEnabled",
    "soundLevel",
    "selection",
    "selStart",
    "selEnd",
    "result",
    "paramCount",
    "exitLock",
    "fullColorPermit",
    "checkBoxAccess",
    "checkBoxType",
    "timeoutLength",
    "timeoutKeyDown",
    "timeoutLapsed",
    "timeoutMouse",
    "timeoutPlay",
    "timeoutScript",
    "multiSound",
    "machineType",
    "menu",
    "itemDelimiter",
];

const FIELDS: &[&str] = &[
    "locH",
    "locV",
    "width",
    "height",
    "left",
    "top",
    "right",
    "bottom",
    "rect",
    "visible",
    "castNum",
    "ink",
    "blend",
    "foreColor",
    "backColor",
    "name",
    "text",
    "loaded",
    "puppet",
    "moveableSprite",
    "number",
    "picture",
    "fileName",
    "constraint",
    "cursor",
    "stretch",
    "trails",
    "type",
    "size",
    "hilite",
    "scriptText",
    "editableText",
    "textFont",
    "textSize",
    "textStyle",
    "textAlign",
    "lineSize",
    "drawRect",
    "sourceRect",
    "title",
    "titleVisible",
    "modal",
    "regPoint",
    "center",
    "crop",
    "palette",
    "purgePriority",
    "controller",
    "depth",
    "duration",
    "frameRate",
    "loop",
    "movieRate",
    "movieTime",
    "pausedAtStart",
    "sound",
    "video",
    "volume",
    "windowType",
    "enabled",
    "checkMark",
    "script",
];

lazy_static! {
    static ref ENTITY_TABLE: HashMap<String, EntityInfo> = {
        let mut table = HashMap::new();
        let mut code = 1;
        for name in ID_ENTITIES {
            table.insert(fold_name(name), EntityInfo { code, takes_id: true });
            code += 1;
        }
        for name in PLAIN_ENTITIES {
            table.insert(fold_name(name), EntityInfo { code, takes_id: false });
            code += 1;
        }
        table
    };
    static ref FIELD_TABLE: HashMap<String, u32> = FIELDS
        .iter()
        .enumerate()
        .map(|(i, name)| (fold_name(name), i as u32 + 1))
        .collect();
}

pub fn lookup_entity(name: &str) -> Option<EntityInfo> {
    ENTITY_TABLE.get(&fold_name(name)).copied()
}

pub fn lookup_field(name: &str) -> Option<u32> {
    FIELD_TABLE.get(&fold_name(name)).copied()
}

pub fn entity_name(code: u32) -> Option<&'static str> {
    let index = code.checked_sub(1)? as usize;
    ID_ENTITIES
        .iter()
        .chain(PLAIN_ENTITIES.iter())
        .nth(index)
        .copied()
}

pub fn field_name(code: u32) -> Option<&'static str> {
    let index = code.checked_sub(1)? as usize;
    FIELDS.get(index).copied()
}
