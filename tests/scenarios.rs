//! End-to-end scenarios (E1-E7), built directly with the AST builder
//! API rather than any VCL source text, since text parsing is out of
//! scope for this crate.

use vcl_engine::ast::{AclDecl, BinaryOp, Expression, Program, Statement, Subroutine};
use vcl_engine::config::EngineConfig;
use vcl_engine::{compile, execute, run_to_completion, Context};

fn recv_acl_program() -> Program {
    Program::new()
        .with_acl(
            AclDecl::new("t")
                .with_entry("192.168.0.0", Some(24))
                .with_entry("10.0.0.0", Some(8)),
        )
        .with_subroutine(
            Subroutine::new("vcl_recv").with_statement(Statement::if_stmt(
                Expression::binary(BinaryOp::Match, Expression::ident("client.ip"), Expression::ident("t")),
                vec![Statement::set("req.http.X-T", Expression::string("yes"))],
                vec![Statement::set("req.http.X-T", Expression::string("no"))],
            )).with_statement(Statement::return_action("lookup")),
        )
}

#[test]
fn e1_acl_membership_ipv4_cidr() {
    let program = recv_acl_program();
    let compiled = compile(&program);

    let mut inside = Context::from_program(&program, EngineConfig::default());
    inside.client.ip = "192.168.0.10".to_string();
    let action = execute(&compiled, "vcl_recv", &mut inside).unwrap();
    assert_eq!(action, "lookup");
    assert_eq!(inside.req.http.get("X-T"), Some("yes"));

    let mut outside = Context::from_program(&program, EngineConfig::default());
    outside.client.ip = "172.16.0.1".to_string();
    execute(&compiled, "vcl_recv", &mut outside).unwrap();
    assert_eq!(outside.req.http.get("X-T"), Some("no"));
}

#[test]
fn e2_ttl_suffix_parsing() {
    let program = Program::new().with_subroutine(
        Subroutine::new("vcl_fetch")
            .with_statement(Statement::set("beresp.ttl", Expression::string("24h")))
            .with_statement(Statement::set("beresp.grace", Expression::string("12h")))
            .with_statement(Statement::set(
                "resp.http.X-TTL",
                Expression::ident("beresp.ttl"),
            ))
            .with_statement(Statement::set(
                "resp.http.X-Grace",
                Expression::ident("beresp.grace"),
            ))
            .with_statement(Statement::return_action("deliver")),
    );
    let compiled = compile(&program);
    let mut ctx = Context::from_program(&program, EngineConfig::default());
    let action = execute(&compiled, "vcl_fetch", &mut ctx).unwrap();
    assert_eq!(action, "deliver");
    assert_eq!(ctx.beresp.scalar("ttl").unwrap().as_i64(), 86400);
    assert_eq!(ctx.beresp.scalar("grace").unwrap().as_i64(), 43200);
    assert_eq!(ctx.resp.http.get("X-TTL"), Some("86400"));
    assert_eq!(ctx.resp.http.get("X-Grace"), Some("43200"));
}

#[test]
fn e3_compound_add_assign() {
    let program = Program::new().with_subroutine(
        Subroutine::new("vcl_recv")
            .with_statement(Statement::set("req.http.X", Expression::string("Hello")))
            .with_statement(Statement::set_compound(
                "req.http.X",
                vcl_engine::ast::CompoundOp::Add,
                Expression::string(", World!"),
            ))
            .with_statement(Statement::set("req.http.Y", Expression::string("10")))
            .with_statement(Statement::set_compound(
                "req.http.Y",
                vcl_engine::ast::CompoundOp::Add,
                Expression::integer(5),
            ))
            .with_statement(Statement::return_action("lookup")),
    );
    let compiled = compile(&program);
    let mut ctx = Context::from_program(&program, EngineConfig::default());
    execute(&compiled, "vcl_recv", &mut ctx).unwrap();
    assert_eq!(ctx.req.http.get("X"), Some("Hello, World!"));
    assert_eq!(ctx.req.http.get("Y"), Some("105"));
}

#[test]
fn e4_restart_reenters_recv() {
    let program = Program::new().with_subroutine(
        Subroutine::new("vcl_recv").with_statement(Statement::if_stmt(
            Expression::binary(BinaryOp::Eq, Expression::ident("req.restarts"), Expression::integer(0)),
            vec![Statement::restart()],
            vec![Statement::set("req.http.X", Expression::string("after"))],
        )).with_statement(Statement::return_action("lookup")),
    );
    let compiled = compile(&program);
    let mut ctx = Context::from_program(&program, EngineConfig::default());

    let first = execute(&compiled, "vcl_recv", &mut ctx).unwrap();
    assert_eq!(first, "restart");
    assert_eq!(ctx.restarts(), 1);

    let second = execute(&compiled, "vcl_recv", &mut ctx).unwrap();
    assert_eq!(second, "lookup");
    assert_eq!(ctx.req.http.get("X"), Some("after"));

    let mut via_loop = Context::from_program(&program, EngineConfig::default());
    let final_action = run_to_completion(&compiled, "vcl_recv", &mut via_loop).unwrap();
    assert_eq!(final_action, "lookup");
    assert_eq!(via_loop.restarts(), 1);
}

#[test]
fn e5_regex_capture_groups() {
    let program = Program::new().with_subroutine(
        Subroutine::new("vcl_recv").with_statement(Statement::if_stmt(
            Expression::binary(
                BinaryOp::Match,
                Expression::ident("req.url"),
                Expression::string("^/users/([0-9]+)"),
            ),
            vec![Statement::set("req.http.X-UID", Expression::ident("re.group.1"))],
            vec![],
        )).with_statement(Statement::return_action("lookup")),
    );
    let compiled = compile(&program);
    let mut ctx = Context::from_program(&program, EngineConfig::default());
    ctx.req.set_scalar("url", vcl_engine::Value::string("/users/123"));
    execute(&compiled, "vcl_recv", &mut ctx).unwrap();
    assert_eq!(ctx.req.http.get("X-UID"), Some("123"));
    assert_eq!(ctx.re_groups[0], "/users/123");
}

#[test]
fn e6_goto_flow_skips_straight_line_statements() {
    let program = Program::new().with_subroutine(
        Subroutine::new("vcl_recv")
            .with_statement(Statement::if_stmt(
                Expression::boolean(true),
                vec![Statement::goto("admin_processing")],
                vec![],
            ))
            .with_statement(Statement::set("var.skipped", Expression::boolean(true)))
            .with_statement(Statement::label(
                "admin_processing",
                Some(Statement::set("var.reached", Expression::boolean(true))),
            ))
            .with_statement(Statement::return_action("lookup")),
    );
    let compiled = compile(&program);
    let mut ctx = Context::from_program(&program, EngineConfig::default());
    let action = execute(&compiled, "vcl_recv", &mut ctx).unwrap();
    assert_eq!(action, "lookup");
    assert!(ctx.locals.get("reached").unwrap().as_bool());
    assert!(ctx.locals.get("skipped").is_none());
}

#[test]
fn e7_ipv6_acl_membership() {
    let program = Program::new()
        .with_acl(AclDecl::new("v6").with_entry("2001:db8::", Some(32)))
        .with_subroutine(Subroutine::new("vcl_recv").with_statement(Statement::if_stmt(
            Expression::binary(BinaryOp::Match, Expression::ident("client.ip"), Expression::ident("v6")),
            vec![Statement::set("req.http.X-T", Expression::string("yes"))],
            vec![Statement::set("req.http.X-T", Expression::string("no"))],
        )));
    let compiled = compile(&program);

    let mut inside = Context::from_program(&program, EngineConfig::default());
    inside.client.ip = "2001:db8::1".to_string();
    execute(&compiled, "vcl_recv", &mut inside).unwrap();
    assert_eq!(inside.req.http.get("X-T"), Some("yes"));

    let mut outside = Context::from_program(&program, EngineConfig::default());
    outside.client.ip = "2001:db9::".to_string();
    execute(&compiled, "vcl_recv", &mut outside).unwrap();
    assert_eq!(outside.req.http.get("X-T"), Some("no"));
}
