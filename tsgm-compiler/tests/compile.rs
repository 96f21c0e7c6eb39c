use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tsgm_compiler::extract::extract_definitions;
use tsgm_compiler::gmx::{Project, ResourceKind};
use tsgm_compiler::pipeline::read_bindings;
use tsgm_compiler::{CompilerConfig, CompilerError, Compiler, LuaLibImportKind, Target, LUALIB_BUNDLE_NAME};

const GAME_DEFINITIONS: &str = "\
/** @object */
declare class GMObject {
    x: number;
    y: number;
}
/** @room */
declare class Room {}
declare function show_debug_message(value: any): void;
";

fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn lua_config(dir: &Path) -> CompilerConfig {
    CompilerConfig {
        root_dir: dir.join("src"),
        out_dir: dir.join("build"),
        ..CompilerConfig::default()
    }
}

#[test]
fn test_lua_outputs_mirror_the_source_tree() {
    let dir = TempDir::new().unwrap();
    let main = write(dir.path(), "src/main.ts", "let a = 1;\n");
    let util = write(dir.path(), "src/lib/util.ts", "export function twice(n: number) { return n * 2; }\n");

    let outcome = Compiler::new(lua_config(dir.path())).compile(&[main, util]).unwrap();
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);

    let build = dir.path().join("build");
    assert_eq!(fs::read_to_string(build.join("main.lua")).unwrap(), "local a = 1;\n");
    let util_lua = fs::read_to_string(build.join("lib").join("util.lua")).unwrap();
    assert!(util_lua.starts_with("local exports = exports or {}"), "{util_lua}");
    assert!(util_lua.ends_with("return exports;\n"), "{util_lua}");
    assert!(build.join(LUALIB_BUNDLE_NAME).exists());
    assert_eq!(outcome.written.len(), 3);
}

#[test]
fn test_runtime_bundle_is_not_copied_without_imports() {
    let dir = TempDir::new().unwrap();
    let main = write(dir.path(), "src/main.ts", "let a = 1;\n");
    let config = CompilerConfig {
        lua_lib_import: LuaLibImportKind::None,
        ..lua_config(dir.path())
    };

    Compiler::new(config).compile(&[main]).unwrap();
    assert!(dir.path().join("build").join("main.lua").exists());
    assert!(!dir.path().join("build").join(LUALIB_BUNDLE_NAME).exists());
}

#[test]
fn test_included_files_and_single_output_file() {
    let dir = TempDir::new().unwrap();
    let main = write(dir.path(), "src/main.ts", "let a = 1;\n");
    let config = CompilerConfig {
        include: vec![main],
        out_file: Some(PathBuf::from("game.lua")),
        lua_lib_import: LuaLibImportKind::None,
        ..lua_config(dir.path())
    };

    let outcome = Compiler::new(config).compile(&[]).unwrap();
    assert_eq!(outcome.written, vec![dir.path().join("build").join("game.lua")]);
}

#[test]
fn test_type_errors_stop_before_writing() {
    let dir = TempDir::new().unwrap();
    let main = write(dir.path(), "src/main.ts", "let a: number = missing;\n");

    let outcome = Compiler::new(lua_config(dir.path())).compile(&[main]).unwrap();
    assert!(outcome.has_errors());
    let line = outcome.diagnostics[0].to_string();
    assert!(line.starts_with("2304: "), "{line}");
    assert!(line.ends_with("(1,17): Cannot find name 'missing'."), "{line}");
    assert!(outcome.written.is_empty());
    assert!(!dir.path().join("build").exists());
}

#[test]
fn test_lowering_errors_carry_the_position() {
    let dir = TempDir::new().unwrap();
    let main = write(dir.path(), "src/main.ts", "let ok = 1;\nlet local = 2;\n");

    let error = Compiler::new(lua_config(dir.path())).compile(&[main]).unwrap_err();
    match error {
        CompilerError::Transpile { line, message, .. } => {
            assert_eq!(line, 2);
            assert_eq!(message, "Cannot use Lua keyword local as identifier.");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("build").join("main.lua").exists());
}

#[test]
fn test_missing_source_file() {
    let dir = TempDir::new().unwrap();
    let error = Compiler::new(lua_config(dir.path()))
        .compile(&[dir.path().join("nope.ts")])
        .unwrap_err();
    assert!(matches!(error, CompilerError::Io { .. }), "{error}");
}

struct GameProject {
    dir: TempDir,
    project_file: PathBuf,
    definitions: PathBuf,
}

impl GameProject {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let project_file = dir.path().join("game").join("game.project.gmx");
        fs::create_dir_all(project_file.parent().unwrap()).unwrap();
        let mut project = Project::new();
        project.add(ResourceKind::Sprite, "sprites\\spr_player");
        project.save(&project_file).unwrap();
        let definitions = write(dir.path(), "src/game.d.ts", GAME_DEFINITIONS);
        GameProject {
            dir,
            project_file,
            definitions,
        }
    }

    fn project_dir(&self) -> &Path {
        self.project_file.parent().unwrap()
    }

    fn compile(&self, source: &str) -> Result<tsgm_compiler::CompileOutcome, CompilerError> {
        let main = write(self.dir.path(), "src/main.ts", source);
        let config = CompilerConfig {
            target: Target::Gml,
            project_file: Some(self.project_file.clone()),
            ..CompilerConfig::default()
        };
        Compiler::new(config).compile(&[self.definitions.clone(), main])
    }
}

const GAME_SOURCE: &str = "\
function greet(name: string) {
    show_debug_message(\"hi \" + name);
}
class Player extends GMObject {
    speed = 4;
    step() {
        this.x += this.speed;
    }
}
";

#[test]
fn test_gml_resources_update_the_project() {
    let game = GameProject::new();
    let outcome = game.compile(GAME_SOURCE).unwrap();
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert_eq!(outcome.bindings, vec!["scripts\\greet.gml", "objects\\Player.object.gmx"]);

    let script = fs::read_to_string(game.project_dir().join("scripts").join("greet.gml")).unwrap();
    assert_eq!(
        script,
        "/// Usage:  greet(name)\nvar name = argument[0];\nshow_debug_message(\"hi \" + name);\n"
    );
    let object = fs::read_to_string(game.project_dir().join("objects").join("Player.object.gmx")).unwrap();
    assert!(object.contains("speed = 4;"), "{object}");
    assert!(object.contains("self.x += self.speed;"), "{object}");

    let project = Project::load(&game.project_file).unwrap();
    assert_eq!(project.entries(ResourceKind::Script), vec!["scripts\\greet.gml"]);
    assert_eq!(project.entries(ResourceKind::Object), vec!["objects\\Player"]);
    assert_eq!(project.entries(ResourceKind::Sprite), vec!["sprites\\spr_player"]);
    assert_eq!(read_bindings(game.project_dir()).unwrap(), outcome.bindings);
}

#[test]
fn test_gml_recompile_prunes_stale_resources() {
    let game = GameProject::new();
    game.compile(GAME_SOURCE).unwrap();

    let outcome = game.compile("function greet(name: string) {}\n").unwrap();
    assert_eq!(outcome.removed, vec!["objects\\Player.object.gmx"]);
    assert!(!game.project_dir().join("objects").join("Player.object.gmx").exists());

    let project = Project::load(&game.project_file).unwrap();
    assert!(project.entries(ResourceKind::Object).is_empty());
    assert_eq!(project.entries(ResourceKind::Script), vec!["scripts\\greet.gml"]);
    assert_eq!(read_bindings(game.project_dir()).unwrap(), vec!["scripts\\greet.gml"]);
}

#[test]
fn test_extracted_definitions_skip_generated_resources() {
    let game = GameProject::new();
    game.compile(GAME_SOURCE).unwrap();

    let out_file = game.dir.path().join("src").join("project.d.ts");
    let content = extract_definitions(&game.project_file, &out_file).unwrap();
    assert_eq!(content, "declare const spr_player: Sprite;\n");
}

#[test]
fn test_gml_target_needs_a_project() {
    let dir = TempDir::new().unwrap();
    let main = write(dir.path(), "main.ts", "function f() {}\n");
    let config = CompilerConfig {
        target: Target::Gml,
        ..CompilerConfig::default()
    };
    let error = Compiler::new(config).compile(&[main]).unwrap_err();
    assert!(matches!(error, CompilerError::Config(_)), "{error}");
}
