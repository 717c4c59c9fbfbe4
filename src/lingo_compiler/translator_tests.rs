// Translator tests: emitted layouts, definitions and error recovery

#[cfg(test)]
mod tests {
    use crate::lingo_compiler::config::CompilerConfig;
    use crate::lingo_compiler::diagnostics::{DiagnosticKind, Diagnostics};
    use crate::lingo_compiler::disasm::disassemble;
    use crate::lingo_compiler::lexer::Lexer;
    use crate::lingo_compiler::script::ScriptBuffer;
    use crate::lingo_compiler::symbols::DefinitionKind;
    use crate::lingo_compiler::translator::Translator;
    use crate::lingo_compiler::CompiledScript;
    use test_log::test;

    fn translate_with(source: &str, config: CompilerConfig) -> (CompiledScript, Diagnostics) {
        Translator::new(Box::new(Lexer::new(source)), config)
            .translate()
            .unwrap()
    }

    fn translate(source: &str) -> (CompiledScript, Diagnostics) {
        translate_with(source, CompilerConfig::default())
    }

    /// Listing lines without their marks
    fn ops(code: &ScriptBuffer) -> Vec<String> {
        disassemble(code)
            .lines()
            .map(|line| match line.split_once(": ") {
                Some((_, rest)) => rest.to_string(),
                None => line.to_string(),
            })
            .collect()
    }

    /// Listing lines with their marks, leading blanks trimmed
    fn listing(code: &ScriptBuffer) -> Vec<String> {
        disassemble(code)
            .lines()
            .map(|line| line.trim_start().to_string())
            .collect()
    }

    fn errors(diagnostics: &Diagnostics) -> usize {
        diagnostics.errors().count()
    }

    #[test]
    fn test_arithmetic_precedence() {
        let (script, diagnostics) = translate("x = 1 + 2 * 3");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            ops(&script.code),
            vec![
                "INTPUSH 1",
                "INTPUSH 2",
                "INTPUSH 3",
                "MUL",
                "ADD",
                "VARPUSH \"x\"",
                "ASSIGN",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_parentheses_and_unary() {
        let (script, _) = translate("x = -(1 + 2) * 3");
        assert_eq!(
            ops(&script.code),
            vec![
                "INTPUSH 1",
                "INTPUSH 2",
                "ADD",
                "NEGATE",
                "INTPUSH 3",
                "MUL",
                "VARPUSH \"x\"",
                "ASSIGN",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        let (script, _) = translate("global a, b\nx = not a and b");
        assert_eq!(
            ops(&script.code),
            vec![
                "GLOBAL \"a\"",
                "GLOBAL \"b\"",
                "EVAL \"a\"",
                "NOT",
                "EVAL \"b\"",
                "AND",
                "VARPUSH \"x\"",
                "ASSIGN",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_comparison_below_concatenation() {
        let (script, _) = translate("x = \"a\" & \"b\" = \"ab\"");
        assert_eq!(
            ops(&script.code)[..5],
            [
                "STRINGPUSH \"a\"",
                "STRINGPUSH \"b\"",
                "AMPERSAND",
                "STRINGPUSH \"ab\"",
                "EQ"
            ]
        );
    }

    #[test]
    fn test_set_forms_are_equivalent() {
        let (bare, _) = translate("x = 5");
        let (set_to, _) = translate("set x to 5");
        let (set_eq, _) = translate("set x = 5");
        assert_eq!(bare.code.words(), set_to.code.words());
        assert_eq!(bare.code.words(), set_eq.code.words());
    }

    #[test]
    fn test_constants_are_folded() {
        let (script, diagnostics) = translate("x = TRUE\ny = empty");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            ops(&script.code),
            vec![
                "INTPUSH 1",
                "VARPUSH \"x\"",
                "ASSIGN",
                "STRINGPUSH \"\"",
                "VARPUSH \"y\"",
                "ASSIGN",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_entity_assignment_pushes_placeholder_id() {
        let (script, _) = translate("set the volume to 5");
        assert_eq!(
            ops(&script.code),
            vec!["INTPUSH 5", "INTPUSH 0", "THEENTITYASSIGN volume #0", "STOP"]
        );
    }

    #[test]
    fn test_entity_with_id_assignment_swaps() {
        let (script, _) = translate("set the locH of sprite 1 to 10");
        assert_eq!(
            ops(&script.code),
            vec![
                "INTPUSH 1",
                "INTPUSH 10",
                "SWAP",
                "THEENTITYASSIGN sprite locH",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_entity_read_with_id() {
        let (script, _) = translate("x = the locH of sprite 2 + 1");
        assert_eq!(
            ops(&script.code)[..4],
            ["INTPUSH 2", "THEENTITYPUSH sprite locH", "INTPUSH 1", "ADD"]
        );
    }

    #[test]
    fn test_object_field_assignment() {
        let (script, diagnostics) = translate("global obj\nset the text of obj to \"hi\"");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            ops(&script.code),
            vec![
                "GLOBAL \"obj\"",
                "STRINGPUSH \"hi\"",
                "OBJECTFIELDASSIGN \"obj\" text",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_put_after_splices() {
        let (script, _) = translate("s = \"a\"\nput \"b\" after s");
        assert_eq!(
            ops(&script.code)[3..],
            [
                "STRINGPUSH \"b\"",
                "EVAL \"s\"",
                "AFTER",
                "VARPUSH \"s\"",
                "ASSIGN",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_put_without_target_prints() {
        let (script, _) = translate("put 3");
        assert_eq!(ops(&script.code), vec!["INTPUSH 3", "PRINTTOP", "STOP"]);
    }

    #[test]
    fn test_chunk_range() {
        let (script, _) = translate("s = \"hello\"\nput char 2 to 4 of s");
        assert_eq!(
            ops(&script.code)[3..],
            ["INTPUSH 2", "INTPUSH 4", "EVAL \"s\"", "CHARTOOF", "PRINTTOP", "STOP"]
        );
    }

    #[test]
    fn test_list_literals() {
        let (script, _) = translate("x = [1, 2]\ny = [#a: 1]\nz = []\nw = [:]");
        assert_eq!(
            ops(&script.code),
            vec![
                "INTPUSH 1",
                "INTPUSH 2",
                "ARRAYPUSH 2",
                "VARPUSH \"x\"",
                "ASSIGN",
                "SYMBOLPUSH \"a\"",
                "INTPUSH 1",
                "PROPARRAYPUSH 1",
                "VARPUSH \"y\"",
                "ASSIGN",
                "ARRAYPUSH 0",
                "VARPUSH \"z\"",
                "ASSIGN",
                "PROPARRAYPUSH 0",
                "VARPUSH \"w\"",
                "ASSIGN",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_calls() {
        let (script, diagnostics) = translate("x = random(6)\nbeep\nplayAccel \"intro\"");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            ops(&script.code),
            vec![
                "INTPUSH 6",
                "CALL \"random\" 1 0",
                "VARPUSH \"x\"",
                "ASSIGN",
                "PROCCALL \"beep\" 0 0",
                "STRINGPUSH \"intro\"",
                "PROCCALL \"playAccel\" 1 1",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_builtin_function_without_parentheses() {
        let (script, diagnostics) = translate("x = random 10 + 1\ny = length \"abc\"");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            ops(&script.code),
            vec![
                "INTPUSH 10",
                "CALL \"random\" 1 0",
                "INTPUSH 1",
                "ADD",
                "VARPUSH \"x\"",
                "ASSIGN",
                "STRINGPUSH \"abc\"",
                "CALL \"length\" 1 0",
                "VARPUSH \"y\"",
                "ASSIGN",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_function_name_without_operand_is_read() {
        let (script, diagnostics) = translate("count = 2\nput count");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert!(ops(&script.code).contains(&"EVAL \"count\"".to_string()));
    }

    #[test]
    fn test_builtin_arity_warning() {
        let (script, diagnostics) = translate("puppetSprite 1");
        assert_eq!(diagnostics.count(DiagnosticKind::ArgumentCount), 1);
        assert!(!diagnostics.had_error());
        assert_eq!(ops(&script.code)[1], "PROCCALL \"puppetSprite\" 1 0");

        let config = CompilerConfig {
            check_builtin_arity: false,
            ..CompilerConfig::default()
        };
        let (_, diagnostics) = translate_with("puppetSprite 1", config);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_go_and_play_selectors() {
        let (script, _) = translate(
            "go to frame 5\ngo loop\ngo next\ngo previous\ngo to movie \"m\"\nplay frame 3 of movie \"m\"\nplay done",
        );
        assert_eq!(
            ops(&script.code),
            vec![
                "INTPUSH 5",
                "INTPUSH 1",
                "GOTO",
                "INTPUSH 4",
                "GOTO",
                "INTPUSH 3",
                "GOTO",
                "INTPUSH 2",
                "GOTO",
                "STRINGPUSH \"m\"",
                "INTPUSH 5",
                "GOTO",
                "INTPUSH 3",
                "STRINGPUSH \"m\"",
                "INTPUSH 6",
                "PLAY",
                "INTPUSH 7",
                "PLAY",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_open_without_application() {
        let (script, _) = translate("open \"doc\"\nopen \"doc\" with \"app\"");
        assert_eq!(
            ops(&script.code),
            vec![
                "STRINGPUSH \"doc\"",
                "VOIDPUSH",
                "OPEN",
                "STRINGPUSH \"doc\"",
                "STRINGPUSH \"app\"",
                "OPEN",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_lone_one_line_if() {
        let (script, _) = translate("global x\nif x then beep");
        assert_eq!(
            listing(&script.code),
            vec![
                "0: GLOBAL \"x\"",
                "2: EVAL \"x\"",
                "4: IF +0 +0 +9 (->13) 1",
                "9: PROCCALL \"beep\" 0 0",
                "13: STOP",
                "14: STOP"
            ]
        );
    }

    #[test]
    fn test_block_if_else() {
        let (script, diagnostics) =
            translate("global x\nif x then\n  a = 1\nelse\n  a = 2\nend if");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            listing(&script.code),
            vec![
                "0: GLOBAL \"x\"",
                "2: EVAL \"x\"",
                "4: IF +5 (->9) +11 (->15) +16 (->20) 0",
                "9: INTPUSH 1",
                "11: VARPUSH \"a\"",
                "13: ASSIGN",
                "14: STOP",
                "15: INTPUSH 2",
                "17: VARPUSH \"a\"",
                "19: ASSIGN",
                "20: STOP"
            ]
        );
    }

    #[test]
    fn test_elsif_chain_shares_end() {
        let (script, diagnostics) =
            translate("global x, y\nif x then\n  beep\nelsif y then\n  quit\nend if");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            listing(&script.code),
            vec![
                "0: GLOBAL \"x\"",
                "2: GLOBAL \"y\"",
                "4: EVAL \"x\"",
                "6: IF +5 (->11) +10 (->16) +22 (->28) 0",
                "11: PROCCALL \"beep\" 0 0",
                "15: STOP",
                "16: EVAL \"y\"",
                "18: IF +5 (->23) +0 +10 (->28) 0",
                "23: PROCCALL \"quit\" 0 0",
                "27: STOP",
                "28: STOP"
            ]
        );
    }

    #[test]
    fn test_else_if_matches_elsif() {
        let (elsif, _) = translate("global x, y\nif x then\n  beep\nelsif y then\n  quit\nend if");
        let (else_if, _) =
            translate("global x, y\nif x then\n  beep\nelse if y then\n  quit\nend if");
        assert_eq!(elsif.code.words(), else_if.code.words());
    }

    #[test]
    fn test_dangling_else_binds_to_nearest_if() {
        let (script, diagnostics) = translate("global a, b\nif a then if b then beep else put 1");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let lines = listing(&script.code);
        assert!(lines.contains(&"6: IF +0 +0 +20 (->26) 1".to_string()), "{:?}", lines);
        assert!(lines.contains(&"13: IF +0 +10 (->23) +13 (->26) 0".to_string()), "{:?}", lines);
    }

    #[test]
    fn test_one_line_else_on_next_line() {
        let (script, diagnostics) = translate("global x\nif x then beep\nelse quit");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let lines = listing(&script.code);
        assert_eq!(lines[2], "4: IF +0 +10 (->14) +14 (->18) 0");
    }

    #[test]
    fn test_repeat_while_layout() {
        let (script, diagnostics) = translate("i = 0\nrepeat while i < 3\n  i = i + 1\nend repeat");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let lines = listing(&script.code);
        assert_eq!(lines[3], "5: REPEATWHILE +9 (->14) +18 (->23)");
        assert_eq!(lines[7], "13: STOP");
        assert_eq!(lines[13], "22: STOP");
        assert_eq!(lines[14], "23: STOP");
    }

    #[test]
    fn test_repeat_with_down_to() {
        let (script, diagnostics) = translate("repeat with i = 10 down to 1\n  put i\nend repeat");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(
            listing(&script.code),
            vec![
                "0: REPEATWITH +7 (->7) +10 (->10) +13 (->13) step -1 +17 (->17) \"i\"",
                "7: INTPUSH 10",
                "9: STOP",
                "10: INTPUSH 1",
                "12: STOP",
                "13: EVAL \"i\"",
                "15: PRINTTOP",
                "16: STOP",
                "17: STOP"
            ]
        );
    }

    #[test]
    fn test_repeat_with_up_to_uses_step_one() {
        let (script, _) = translate("repeat with i = 1 to 3\n  beep\nend repeat");
        assert!(listing(&script.code)[0].contains("step 1 "));
    }

    #[test]
    fn test_loop_exits_need_a_loop() {
        let (_, diagnostics) = translate("exit repeat");
        assert_eq!(errors(&diagnostics), 1);

        let (script, diagnostics) =
            translate("repeat while TRUE\n  exit repeat\n  next repeat\nend repeat");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        let ops = ops(&script.code);
        assert!(ops.contains(&"EXITREPEAT".to_string()));
        assert!(ops.contains(&"NEXTREPEAT".to_string()));
    }

    #[test]
    fn test_tell_forms() {
        let (script, _) = translate("global w\ntell w to beep");
        assert_eq!(
            listing(&script.code),
            vec![
                "0: GLOBAL \"w\"",
                "2: EVAL \"w\"",
                "4: TELLCODE +7 (->11)",
                "6: PROCCALL \"beep\" 0 0",
                "10: STOP",
                "11: STOP"
            ]
        );

        let (block, diagnostics) = translate("global w\ntell w\n  beep\nend tell");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(block.code.words(), script.code.words());
    }

    #[test]
    fn test_when_layout() {
        let (script, _) = translate("when mouseDown then beep");
        assert_eq!(
            listing(&script.code),
            vec![
                "0: WHENCODE +8 (->8) \"mouseDown\"",
                "3: PROCCALL \"beep\" 0 0",
                "7: STOP",
                "8: STOP"
            ]
        );
    }

    #[test]
    fn test_handler_definition() {
        let (script, diagnostics) = translate("on add a, b\n  put a + b\nend add");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(ops(&script.code), vec!["STOP"]);

        let handler = script.handler("ADD").unwrap();
        assert_eq!(handler.kind, DefinitionKind::Handler);
        assert_eq!(handler.arity, 2);
        assert_eq!(handler.entry.index(), 0);
        assert_eq!(handler.args, vec!["a", "b"]);
        assert_eq!(
            ops(&handler.code),
            vec![
                "ARGSTORE 2 \"a\" \"b\"",
                "EVAL \"a\"",
                "EVAL \"b\"",
                "ADD",
                "PRINTTOP",
                "RETURN"
            ]
        );
    }

    #[test]
    fn test_parenthesized_parameters() {
        let (script, diagnostics) = translate("on f(a, b)\n  beep\nend f");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(script.handler("f").unwrap().arity, 2);
    }

    #[test]
    fn test_factory_methods_count_the_receiver() {
        let source = "factory Counter\nmethod mNew start\n  instance total\n  total = start\nend mNew\nmethod mAdd\n  total = total + 1\nend mAdd";
        let (script, diagnostics) = translate(source);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let create = script.method("counter", "mnew").unwrap();
        assert_eq!(create.arity, 2);
        assert_eq!(create.factory.as_deref(), Some("Counter"));
        assert_eq!(ops(&create.code)[0], "ARGSTORE 2 \"me\" \"start\"");

        let add = script.method("Counter", "mAdd").unwrap();
        assert_eq!(add.arity, 1);
        assert!(script.handler("mAdd").is_none());
    }

    #[test]
    fn test_end_clause_is_case_insensitive() {
        let (script, diagnostics) = translate("on MouseUp\n  beep\nend mouseup");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert!(script.handler("mouseUp").is_some());
    }

    #[test]
    fn test_end_clause_mismatch_is_soft() {
        let (script, diagnostics) = translate("on foo\n  beep\nend bar");
        assert_eq!(diagnostics.count(DiagnosticKind::EndClauseMismatch), 1);
        assert!(!diagnostics.had_error());
        assert!(script.handler("foo").is_some());
    }

    #[test]
    fn test_end_clause_mismatch_when_mandatory() {
        let config = CompilerConfig {
            require_end_clause: true,
            ..CompilerConfig::default()
        };
        let (_, diagnostics) = translate_with("on foo\n  beep\nend bar", config.clone());
        assert!(diagnostics.had_error());

        let (_, diagnostics) = translate_with("on foo\n  beep\n", config);
        assert!(diagnostics.had_error());
    }

    #[test]
    fn test_definitions_close_implicitly() {
        let (script, diagnostics) = translate("on a\n  beep\non b\n  quit\nmacro c x\n  put x");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        assert_eq!(script.handlers.len(), 3);
        assert_eq!(script.handler("c").unwrap().kind, DefinitionKind::Macro);
        assert_eq!(script.handler("c").unwrap().arity, 1);
    }

    #[test]
    fn test_redefinition_warns() {
        let (script, diagnostics) = translate("on foo\n  beep\nend foo\non FOO\n  quit\nend foo");
        assert_eq!(diagnostics.count(DiagnosticKind::Redefinition), 1);
        assert_eq!(script.handlers.len(), 1);
        assert_eq!(ops(&script.handler("foo").unwrap().code)[1], "PROCCALL \"quit\" 0 0");
    }

    #[test]
    fn test_method_outside_factory() {
        let (script, diagnostics) = translate("method m\n  beep\nend m\non ok\nend ok");
        assert_eq!(errors(&diagnostics), 1);
        assert!(script.handler("m").is_none());
        assert!(script.handler("ok").is_some());
    }

    #[test]
    fn test_duplicate_parameter() {
        let (script, diagnostics) = translate("on f a, a\n  beep\nend f");
        assert_eq!(errors(&diagnostics), 1);
        assert!(script.handler("f").is_none());
    }

    #[test]
    fn test_definition_inside_statement() {
        let (_, diagnostics) = translate("global x\nif x then on foo");
        assert_eq!(errors(&diagnostics), 1);
    }

    #[test]
    fn test_undefined_reference_warning() {
        let (_, diagnostics) = translate("put y");
        assert_eq!(diagnostics.count(DiagnosticKind::UndefinedReference), 1);
        assert!(!diagnostics.had_error());

        let (_, diagnostics) = translate("on f a\n  put a\nend f");
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);

        let config = CompilerConfig {
            warn_undefined: false,
            ..CompilerConfig::default()
        };
        let (_, diagnostics) = translate_with("put y", config);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_locals_do_not_leak_between_handlers() {
        let (_, diagnostics) = translate("on f\n  x = 1\nend f\non g\n  put x\nend g");
        assert_eq!(diagnostics.count(DiagnosticKind::UndefinedReference), 1);
    }

    #[test]
    fn test_recovery_voids_partial_statement() {
        let (script, diagnostics) = translate("x = 1\ny = 2 +\nz = 3");
        assert_eq!(errors(&diagnostics), 1);
        assert_eq!(diagnostics.records()[0].line, 2);
        assert_eq!(
            ops(&script.code),
            vec![
                "INTPUSH 1",
                "VARPUSH \"x\"",
                "ASSIGN",
                "NOP",
                "NOP",
                "INTPUSH 3",
                "VARPUSH \"z\"",
                "ASSIGN",
                "STOP"
            ]
        );
    }

    #[test]
    fn test_recovery_inside_one_line_if_releases_slots() {
        let (script, diagnostics) = translate("global x\nif x then y =\nbeep");
        assert_eq!(errors(&diagnostics), 1);
        assert!(script.code.pending_slots().is_empty());
        assert_eq!(ops(&script.code).last().map(String::as_str), Some("STOP"));
    }

    #[test]
    fn test_recovery_inside_block_keeps_construct() {
        let (script, diagnostics) =
            translate("global x\nif x then\n  y = = 1\n  beep\nend if\nquit");
        assert_eq!(errors(&diagnostics), 1);
        let ops = ops(&script.code);
        assert!(ops.contains(&"PROCCALL \"beep\" 0 0".to_string()));
        assert!(ops.contains(&"PROCCALL \"quit\" 0 0".to_string()));
    }

    #[test]
    fn test_orphaned_block_reports_once() {
        let (script, diagnostics) = translate("global x\nif x = then\n  beep\nend if\nquit");
        assert_eq!(errors(&diagnostics), 1, "{:?}", diagnostics);
        let ops = ops(&script.code);
        assert!(!ops.contains(&"PROCCALL \"beep\" 0 0".to_string()));
        assert!(ops.contains(&"PROCCALL \"quit\" 0 0".to_string()));
    }

    #[test]
    fn test_if_without_then_skips_its_block() {
        let (script, diagnostics) = translate("global x\nif x\n  beep\nend if\nquit");
        assert_eq!(errors(&diagnostics), 1, "{:?}", diagnostics);
        assert_eq!(diagnostics.records()[0].line, 2);
        let ops = ops(&script.code);
        assert!(!ops.contains(&"PROCCALL \"beep\" 0 0".to_string()));
        assert!(ops.contains(&"PROCCALL \"quit\" 0 0".to_string()));
    }

    #[test]
    fn test_broken_elsif_skips_rest_of_chain() {
        let source = "global x\nif x then\n  beep\nelsif (\n  alert \"no\"\nelse\n  alert \"else\"\nend if\nquit";
        let (script, diagnostics) = translate(source);
        assert_eq!(errors(&diagnostics), 1, "{:?}", diagnostics);
        assert_eq!(diagnostics.records()[0].line, 4);
        let ops = ops(&script.code);
        assert!(!ops.iter().any(|op| op.starts_with("PROCCALL \"alert\"")));
        assert!(ops.contains(&"PROCCALL \"quit\" 0 0".to_string()));
    }

    #[test]
    fn test_orphaned_block_tracks_nested_blocks() {
        let source = "global x\nif x =\n  repeat while x\n    beep\n  end repeat\n  if x then\n    beep\n  end if\nend if\nquit";
        let (script, diagnostics) = translate(source);
        assert_eq!(errors(&diagnostics), 1, "{:?}", diagnostics);
        let ops = ops(&script.code);
        assert!(!ops.contains(&"PROCCALL \"beep\" 0 0".to_string()));
        assert!(ops.contains(&"PROCCALL \"quit\" 0 0".to_string()));
    }

    #[test]
    fn test_broken_one_line_arm_after_block_arms() {
        let source = "global x\nif x then\n  beep\nelse put (\nend if\nquit";
        let (script, diagnostics) = translate(source);
        assert_eq!(errors(&diagnostics), 1, "{:?}", diagnostics);
        assert!(ops(&script.code).contains(&"PROCCALL \"quit\" 0 0".to_string()));
    }

    #[test]
    fn test_orphaned_block_ends_at_next_definition() {
        let (script, diagnostics) = translate("global x\nif x\n  beep\non f\n  beep\nend f");
        assert_eq!(errors(&diagnostics), 1, "{:?}", diagnostics);
        assert!(!ops(&script.code).contains(&"PROCCALL \"beep\" 0 0".to_string()));
        let handler = script.handler("f").unwrap();
        assert!(ops(&handler.code).contains(&"PROCCALL \"beep\" 0 0".to_string()));
    }

    #[test]
    fn test_stray_end() {
        let (_, diagnostics) = translate("end if\nbeep");
        assert_eq!(errors(&diagnostics), 1);
    }

    #[test]
    fn test_lexical_error_is_reported() {
        let (_, diagnostics) = translate("x = the nonsense\nbeep");
        assert_eq!(errors(&diagnostics), 1);
        assert!(diagnostics.records()[0].message.contains("nonsense"));
    }

    #[test]
    fn test_all_buffers_resolved() {
        let source = "on f a\n  if a then\n    repeat with i = 1 to a\n      tell i to beep\n    end repeat\n  else if a > 2 then put a\n  end if\nend f";
        let (script, diagnostics) = translate(source);
        assert!(!diagnostics.had_error(), "{:?}", diagnostics);
        for handler in script.all_handlers() {
            assert!(handler.code.verify_resolved().is_ok());
        }
        assert!(script.code.verify_resolved().is_ok());
    }
}
