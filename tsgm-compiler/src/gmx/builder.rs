//! Default records of the GameMaker project format
//!
//! Callers fill in the variable parts (event code, room creation code,
//! parent object) after construction.

use super::xml::Element;

/// Empty `.project.gmx` skeleton
pub fn new_project() -> Element {
    let folder = |collection: &str, name: &str| Element::new(collection).with_attribute("name", name);
    Element::new("assets")
        .with_child(folder("Configs", "configs").with_child(Element::leaf("Config", "Configs\\Default")))
        .with_child(Element::new("NewExtensions"))
        .with_child(folder("sounds", "sound"))
        .with_child(folder("sprites", "sprites"))
        .with_child(folder("backgrounds", "backgrounds"))
        .with_child(folder("paths", "paths"))
        .with_child(folder("scripts", "scripts"))
        .with_child(folder("objects", "objects"))
        .with_child(folder("rooms", "rooms"))
        .with_child(Element::new("help").with_child(Element::leaf("rtf", "help.rtf")))
        .with_child(
            Element::new("TutorialState")
                .with_child(Element::leaf("IsTutorial", 0))
                .with_child(Element::new("TutorialName"))
                .with_child(Element::leaf("TutorialPage", 0)),
        )
}

/// Event running `script` as a code action
pub fn new_event(event_type: u32, event_number: u32, script: &str) -> Element {
    let argument = Element::new("argument")
        .with_child(Element::leaf("kind", 1))
        .with_child(Element::leaf("string", script));
    let action = Element::new("action")
        .with_child(Element::leaf("libid", 1))
        .with_child(Element::leaf("id", 603))
        .with_child(Element::leaf("kind", 7))
        .with_child(Element::leaf("userelative", 0))
        .with_child(Element::leaf("isquestion", 0))
        .with_child(Element::leaf("useapplyto", -1))
        .with_child(Element::leaf("exetype", 2))
        .with_child(Element::new("functionname"))
        .with_child(Element::new("codestring"))
        .with_child(Element::leaf("whoName", "self"))
        .with_child(Element::leaf("relative", 0))
        .with_child(Element::leaf("isnot", 0))
        .with_child(Element::new("arguments").with_child(argument));
    Element::new("event")
        .with_attribute("eventtype", event_type)
        .with_attribute("enumb", event_number)
        .with_child(action)
}

/// Object with no sprite, parent or events and the default physics settings
pub fn new_object() -> Element {
    Element::new("object")
        .with_child(Element::leaf("spriteName", "<undefined>"))
        .with_child(Element::leaf("solid", 0))
        .with_child(Element::leaf("visible", -1))
        .with_child(Element::leaf("depth", 0))
        .with_child(Element::leaf("persistent", 0))
        .with_child(Element::leaf("parentName", "<undefined>"))
        .with_child(Element::leaf("maskName", "<undefined>"))
        .with_child(Element::new("events"))
        .with_child(Element::leaf("PhysicsObject", 0))
        .with_child(Element::leaf("PhysicsObjectSensor", 0))
        .with_child(Element::leaf("PhysicsObjectShape", 2))
        .with_child(Element::leaf("PhysicsObjectDensity", 0.5))
        .with_child(Element::leaf("PhysicsObjectRestitution", "0.100000001490116"))
        .with_child(Element::leaf("PhysicsObjectGroup", 0))
        .with_child(Element::leaf("PhysicsObjectLinearDamping", "0.100000001490116"))
        .with_child(Element::leaf("PhysicsObjectAngularDamping", "0.100000001490116"))
        .with_child(Element::leaf("PhysicsObjectFriction", "0.200000002980232"))
        .with_child(Element::leaf("PhysicsObjectAwake", -1))
        .with_child(Element::leaf("PhysicsObjectKinematic", 0))
        .with_child(Element::new("PhysicsShapePoints"))
}

fn room_background() -> Element {
    Element::new("background")
        .with_child(Element::leaf("visible", 0))
        .with_child(Element::leaf("foreground", 0))
        .with_child(Element::new("name"))
        .with_child(Element::leaf("x", 0))
        .with_child(Element::leaf("y", 0))
        .with_child(Element::leaf("htiled", -1))
        .with_child(Element::leaf("vtiles", -1))
        .with_child(Element::leaf("hspeed", 0))
        .with_child(Element::leaf("vspeed", 0))
        .with_child(Element::leaf("stretch", 0))
}

fn room_view() -> Element {
    Element::new("view")
        .with_child(Element::leaf("visible", 0))
        .with_child(Element::leaf("objName", "<undefined>"))
        .with_child(Element::leaf("xview", 0))
        .with_child(Element::leaf("yview", 0))
        .with_child(Element::leaf("wview", 1024))
        .with_child(Element::leaf("hview", 768))
        .with_child(Element::leaf("xport", 0))
        .with_child(Element::leaf("yport", 0))
        .with_child(Element::leaf("wport", 1024))
        .with_child(Element::leaf("hport", 768))
        .with_child(Element::leaf("hborder", 32))
        .with_child(Element::leaf("vborder", 32))
        .with_child(Element::leaf("hspeed", -1))
        .with_child(Element::leaf("vspeed", -1))
}

/// 1024x768 room with eight hidden backgrounds and views
pub fn new_room() -> Element {
    let make_settings = [
        ("isSet", 0),
        ("w", 0),
        ("h", 0),
        ("showGrid", 0),
        ("showObjects", 0),
        ("showTiles", 0),
        ("showBackgrounds", 0),
        ("showForegrounds", 0),
        ("showViews", 0),
        ("deleteUnderlyingObj", 0),
        ("deleteUnderlyingTiles", 0),
        ("page", 0),
        ("xoffset", 0),
        ("yoffset", 0),
    ];
    Element::new("room")
        .with_child(Element::new("caption"))
        .with_child(Element::leaf("width", 1024))
        .with_child(Element::leaf("height", 768))
        .with_child(Element::leaf("vsnap", 32))
        .with_child(Element::leaf("hsnap", 32))
        .with_child(Element::leaf("isometric", 0))
        .with_child(Element::leaf("speed", 30))
        .with_child(Element::leaf("persistent", 0))
        .with_child(Element::leaf("color", 12632256))
        .with_child(Element::leaf("showcolour", -1))
        .with_child(Element::new("code"))
        .with_child(Element::leaf("enableViews", 0))
        .with_child(Element::leaf("clearViewBackground", -1))
        .with_child(Element::leaf("clearDisplayBuffer", -1))
        .with_child(
            Element::new("makeSettings")
                .with_children(make_settings.iter().map(|(name, value)| Element::leaf(*name, value))),
        )
        .with_child(Element::new("backgrounds").with_children((0..8).map(|_| room_background())))
        .with_child(Element::new("views").with_children((0..8).map(|_| room_view())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmx::xml;

    #[test]
    fn test_project_collections() {
        let project = new_project();
        let names: Vec<&str> = project.children.iter().map(|child| child.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Configs",
                "NewExtensions",
                "sounds",
                "sprites",
                "backgrounds",
                "paths",
                "scripts",
                "objects",
                "rooms",
                "help",
                "TutorialState"
            ]
        );
        assert_eq!(project.child("sounds").and_then(|sounds| sounds.attribute("name")), Some("sound"));
    }

    #[test]
    fn test_event_record() {
        let event = new_event(3, 1, "x += 1;");
        assert_eq!(event.attribute("eventtype"), Some("3"));
        assert_eq!(event.attribute("enumb"), Some("1"));
        let action = event.child("action").unwrap();
        assert_eq!(action.child_text("id"), Some("603"));
        assert_eq!(action.child_text("exetype"), Some("2"));
        assert_eq!(action.child_text("whoName"), Some("self"));
        let argument = action.child("arguments").and_then(|arguments| arguments.child("argument")).unwrap();
        assert_eq!(argument.child_text("string"), Some("x += 1;"));
    }

    #[test]
    fn test_object_defaults() {
        let object = new_object();
        assert_eq!(object.child_text("parentName"), Some("<undefined>"));
        assert_eq!(object.child_text("visible"), Some("-1"));
        assert_eq!(object.child_text("PhysicsObjectDensity"), Some("0.5"));
        assert_eq!(object.child_text("PhysicsObjectFriction"), Some("0.200000002980232"));
        assert!(object.child("events").is_some_and(|events| events.children.is_empty()));
    }

    #[test]
    fn test_room_defaults() {
        let room = new_room();
        assert_eq!(room.child_text("width"), Some("1024"));
        assert_eq!(room.child_text("height"), Some("768"));
        assert_eq!(room.child_text("speed"), Some("30"));
        assert_eq!(room.child_text("color"), Some("12632256"));
        assert_eq!(room.child("backgrounds").unwrap().children.len(), 8);
        let views = room.child("views").unwrap();
        assert_eq!(views.children.len(), 8);
        assert_eq!(views.children[7].child_text("hborder"), Some("32"));
    }

    #[test]
    fn test_records_survive_a_roundtrip() {
        for record in [new_project(), new_object(), new_room(), new_event(0, 0, "a = 1;")] {
            let reread = xml::parse(&xml::to_string(&record).unwrap()).unwrap();
            assert_eq!(reread, record);
        }
    }
}
