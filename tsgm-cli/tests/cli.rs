use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn tsgm(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tsgm"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run tsgm")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_init_config_then_compile() {
    let dir = TempDir::new().unwrap();
    let init = tsgm(dir.path(), &["init-config"]);
    assert!(init.status.success(), "{init:?}");
    assert!(dir.path().join("tsgm.toml").exists());

    let again = tsgm(dir.path(), &["init-config"]);
    assert!(!again.status.success());

    fs::write(dir.path().join("main.ts"), "let greeting = \"hello\";\n").unwrap();
    let compile = tsgm(
        dir.path(),
        &["compile", "main.ts", "--out-dir", "build", "--lua-lib-import", "none"],
    );
    assert!(compile.status.success(), "{compile:?}");
    assert_eq!(
        fs::read_to_string(dir.path().join("build").join("main.lua")).unwrap(),
        "local greeting = \"hello\";\n"
    );
}

#[test]
fn test_type_errors_exit_with_failure() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.ts"), "let a = missing;\n").unwrap();

    let output = tsgm(dir.path(), &["compile", "main.ts"]);
    assert_eq!(output.status.code(), Some(1));
    let printed = stdout(&output);
    assert!(printed.starts_with("2304: "), "{printed}");
    assert!(printed.contains("main.ts (1,9): Cannot find name 'missing'."), "{printed}");
    assert!(!dir.path().join("main.lua").exists());
}

#[test]
fn test_lowering_errors_exit_with_failure() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.ts"), "let local = 1;\n").unwrap();

    let output = tsgm(dir.path(), &["compile", "main.ts"]);
    assert_eq!(output.status.code(), Some(1));
    let printed = String::from_utf8_lossy(&output.stderr).to_string();
    assert!(printed.contains("Cannot use Lua keyword local as identifier."), "{printed}");
}

#[test]
fn test_gml_compile_and_extract() {
    let dir = TempDir::new().unwrap();
    let init = tsgm(dir.path(), &["init-config"]);
    assert!(init.status.success());
    fs::create_dir_all(dir.path().join("game")).unwrap();
    fs::write(
        dir.path().join("game").join("game.project.gmx"),
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <assets>\n  <sprites name=\"sprites\">\n    <sprite>sprites\\spr_hero</sprite>\n  </sprites>\n</assets>\n",
    )
    .unwrap();
    fs::write(dir.path().join("main.ts"), "function hello() {\n    return 1;\n}\n").unwrap();

    let compile = tsgm(
        dir.path(),
        &["compile", "main.ts", "--target", "gml", "--project-file", "game/game.project.gmx"],
    );
    assert!(compile.status.success(), "{compile:?}");
    assert!(dir.path().join("game").join("scripts").join("hello.gml").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("game").join("bindings.json")).unwrap(),
        "[\"scripts\\\\hello.gml\"]"
    );

    let extract = tsgm(
        dir.path(),
        &["extract", "game/game.project.gmx", "--output", "typings/project.d.ts"],
    );
    assert!(extract.status.success(), "{extract:?}");
    assert_eq!(
        fs::read_to_string(dir.path().join("typings").join("project.d.ts")).unwrap(),
        "declare const spr_hero: Sprite;\n"
    );
}
