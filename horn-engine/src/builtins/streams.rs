//! Stream built-ins: open/close, current stream slots, character and
//! byte transfer, term reading and writing, and stream properties.

use super::unify_candidates;
use crate::{
    domain_error, existence_error, instantiation_error, permission_error, resource_error,
    syntax_error, type_error, Cont, EofAction, Got, Machine, ProcedureStore, Promise, Stream,
    StreamMode, StreamTab, StreamType,
};
use horn_parser::{FnSource, Lexer, Reader};
use horn_terms::{func, Env, Term, WriteOpts};
use std::cell::Cell;
use std::rc::Rc;

pub fn register(store: &mut ProcedureStore) {
    store.register_builtin("open", 4, open4);
    store.register_builtin("open", 3, open3);
    store.register_builtin("close", 2, close2);
    store.register_builtin("close", 1, close1);
    store.register_builtin("current_input", 1, current_input);
    store.register_builtin("current_output", 1, current_output);
    store.register_builtin("set_input", 1, set_input);
    store.register_builtin("set_output", 1, set_output);
    store.register_builtin("flush_output", 1, flush_output1);
    store.register_builtin("flush_output", 0, flush_output0);
    store.register_builtin("get_char", 2, get_char);
    store.register_builtin("peek_char", 2, peek_char);
    store.register_builtin("put_char", 2, put_char);
    store.register_builtin("get_byte", 2, get_byte);
    store.register_builtin("peek_byte", 2, peek_byte);
    store.register_builtin("put_byte", 2, put_byte);
    store.register_builtin("read_term", 3, read_term3);
    store.register_builtin("read", 1, read1);
    store.register_builtin("read", 2, read2);
    store.register_builtin("write_term", 3, write_term3);
    store.register_builtin("write", 1, write1);
    store.register_builtin("write", 2, write2);
    store.register_builtin("writeq", 1, writeq1);
    store.register_builtin("write_canonical", 1, write_canonical1);
    store.register_builtin("nl", 0, nl0);
    store.register_builtin("nl", 1, nl1);
    store.register_builtin("stream_property", 2, stream_property);
    store.register_builtin("set_stream_position", 2, set_stream_position);
}

// ----------------------------------------------------------------------
// open and close

struct OpenOptions {
    alias: Option<horn_terms::Atom>,
    typ: StreamType,
    reposition: Option<bool>,
    eof_action: EofAction,
}

fn parse_open_options(env: &Env, list: &Term) -> Result<OpenOptions, Promise> {
    let mut opts = OpenOptions {
        alias: None,
        typ: StreamType::Text,
        reposition: None,
        eof_action: EofAction::EofCode,
    };
    let (items, tail) = env.list_view(list);
    if tail.is_var() {
        return Err(Promise::Error(instantiation_error(tail)));
    }
    if !tail.is_nil() {
        return Err(Promise::Error(type_error("list", env.resolved(list))));
    }
    for item in items {
        let item = env.resolve(&item).clone();
        if item.is_var() {
            return Err(Promise::Error(instantiation_error(item)));
        }
        let bad = || Promise::Error(domain_error("stream_option", env.resolved(&item)));
        let Some(c) = item.as_compound().filter(|c| c.arity() == 1) else {
            return Err(bad());
        };
        let value = env.resolve(&c.args()[0]).clone();
        match (c.functor().as_str(), &value) {
            ("alias", Term::Atom(a)) => opts.alias = Some(a.clone()),
            ("type", Term::Atom(a)) if *a == "text" => opts.typ = StreamType::Text,
            ("type", Term::Atom(a)) if *a == "binary" => opts.typ = StreamType::Binary,
            ("reposition", Term::Atom(a)) if *a == "true" => opts.reposition = Some(true),
            ("reposition", Term::Atom(a)) if *a == "false" => opts.reposition = Some(false),
            ("eof_action", Term::Atom(a)) if *a == "error" => {
                opts.eof_action = EofAction::Error
            }
            ("eof_action", Term::Atom(a)) if *a == "eof_code" => {
                opts.eof_action = EofAction::EofCode
            }
            ("eof_action", Term::Atom(a)) if *a == "reset" => {
                opts.eof_action = EofAction::Reset
            }
            (_, Term::Var(_)) => return Err(Promise::Error(instantiation_error(value))),
            _ => return Err(bad()),
        }
    }
    Ok(opts)
}

fn open4(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let source = env.resolve(&args[0]).clone();
    let name = match &source {
        Term::Var(_) => return Promise::Error(instantiation_error(source)),
        Term::Atom(a) => a.as_str().to_string(),
        other => return Promise::Error(domain_error("source_sink", env.resolved(other))),
    };
    let mode_term = env.resolve(&args[1]).clone();
    let mode = match &mode_term {
        Term::Var(_) => return Promise::Error(instantiation_error(mode_term)),
        Term::Atom(a) => match a.as_str() {
            "read" => StreamMode::Read,
            "write" => StreamMode::Write,
            "append" => StreamMode::Append,
            _ => return Promise::Error(domain_error("io_mode", mode_term.clone())),
        },
        other => return Promise::Error(type_error("atom", env.resolved(other))),
    };
    if !env.resolve(&args[2]).is_var() {
        return Promise::Error(type_error("variable", env.resolved(&args[2])));
    }
    let opts = match parse_open_options(env, &args[3]) {
        Ok(opts) => opts,
        Err(p) => return p,
    };
    if let Some(alias) = &opts.alias {
        let taken = m
            .streams
            .iter()
            .any(|(_, s)| s.alias.as_ref() == Some(alias));
        if taken {
            return Promise::Error(permission_error(
                "open",
                "source_sink",
                func!["alias"; Term::Atom(alias.clone())],
            ));
        }
    }
    let id = match m.streams.open_file(&name, mode) {
        Ok(id) => id,
        Err(_) => return Promise::Error(existence_error("source_sink", source.clone())),
    };
    let stream = m.streams.get_mut(id).expect("just opened");
    stream.alias = opts.alias;
    stream.typ = opts.typ;
    stream.eof_action = opts.eof_action;
    if let Some(reposition) = opts.reposition {
        if reposition && !stream.reposition {
            return Promise::Error(permission_error(
                "open",
                "source_sink",
                func!["reposition"; Term::atom("true")],
            ));
        }
        stream.reposition = reposition;
    }
    m.unify_then(env, &args[2], &StreamTab::term_for(id), k)
}

fn open3(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let with_opts = [
        args[0].clone(),
        args[1].clone(),
        args[2].clone(),
        Term::nil(),
    ];
    open4(m, env, &with_opts, k)
}

fn close_options(env: &Env, list: &Term) -> Result<bool, Promise> {
    let mut force = false;
    let (items, tail) = env.list_view(list);
    if tail.is_var() {
        return Err(Promise::Error(instantiation_error(tail)));
    }
    if !tail.is_nil() {
        return Err(Promise::Error(type_error("list", env.resolved(list))));
    }
    for item in items {
        let item = env.resolve(&item).clone();
        match item.as_struct("force", 1).map(|a| env.resolve(&a[0]).clone()) {
            Some(Term::Atom(a)) if a == "true" => force = true,
            Some(Term::Atom(a)) if a == "false" => force = false,
            _ => {
                return Err(Promise::Error(domain_error(
                    "close_option",
                    env.resolved(&item),
                )))
            }
        }
    }
    Ok(force)
}

fn close2(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match m.streams.resolve(env, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::Error(e),
    };
    let force = match close_options(env, &args[1]) {
        Ok(force) => force,
        Err(p) => return p,
    };
    match m.streams.close(id) {
        Ok(()) => k(m, env),
        Err(e) if force => {
            log::warn!("close(force(true)) suppressed: {e}");
            k(m, env)
        }
        Err(e) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
    }
}

fn close1(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let with_opts = [args[0].clone(), Term::nil()];
    close2(m, env, &with_opts, k)
}

// ----------------------------------------------------------------------
// current stream slots

fn current_input(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let t = StreamTab::term_for(m.streams.current_input());
    m.unify_then(env, &args[0], &t, k)
}

fn current_output(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let t = StreamTab::term_for(m.streams.current_output());
    m.unify_then(env, &args[0], &t, k)
}

fn set_input(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match m.streams.resolve(env, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::Error(e),
    };
    if !m.streams.get(id).is_some_and(Stream::is_input) {
        return Promise::Error(permission_error(
            "input",
            "stream",
            env.resolved(&args[0]),
        ));
    }
    m.streams.set_current_input(id);
    k(m, env)
}

fn set_output(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match m.streams.resolve(env, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::Error(e),
    };
    if !m.streams.get(id).is_some_and(Stream::is_output) {
        return Promise::Error(permission_error(
            "output",
            "stream",
            env.resolved(&args[0]),
        ));
    }
    m.streams.set_current_output(id);
    k(m, env)
}

fn flush_output1(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match m.streams.resolve(env, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::Error(e),
    };
    match m.streams.get_mut(id).map(Stream::flush) {
        Some(Ok(())) => k(m, env),
        Some(Err(e)) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
        None => Promise::Error(existence_error("stream", env.resolved(&args[0]))),
    }
}

fn flush_output0(m: &mut Machine, env: &mut Env, _args: &[Term], k: &Cont) -> Promise {
    let with_stream = [StreamTab::term_for(m.streams.current_output())];
    flush_output1(m, env, &with_stream, k)
}

// ----------------------------------------------------------------------
// character and byte transfer

/// Resolve an input stream of the wanted type, with permission errors
/// for the mismatches.
fn want_input(
    m: &mut Machine,
    env: &Env,
    t: &Term,
    typ: StreamType,
) -> Result<u64, Promise> {
    let id = m.streams.resolve(env, t).map_err(Promise::Error)?;
    let stream = m.streams.get(id).expect("resolved id exists");
    if !stream.is_input() {
        return Err(Promise::Error(permission_error(
            "input",
            "stream",
            env.resolved(t),
        )));
    }
    if stream.typ != typ {
        let kind = match typ {
            StreamType::Text => "binary_stream",
            StreamType::Binary => "text_stream",
        };
        return Err(Promise::Error(permission_error("input", kind, env.resolved(t))));
    }
    Ok(id)
}

fn want_output(
    m: &mut Machine,
    env: &Env,
    t: &Term,
    typ: StreamType,
) -> Result<u64, Promise> {
    let id = m.streams.resolve(env, t).map_err(Promise::Error)?;
    let stream = m.streams.get(id).expect("resolved id exists");
    if !stream.is_output() {
        return Err(Promise::Error(permission_error(
            "output",
            "stream",
            env.resolved(t),
        )));
    }
    if stream.typ != typ {
        let kind = match typ {
            StreamType::Text => "binary_stream",
            StreamType::Binary => "text_stream",
        };
        return Err(Promise::Error(permission_error("output", kind, env.resolved(t))));
    }
    Ok(id)
}

fn past_eof_error(env: &Env, t: &Term) -> Promise {
    Promise::Error(permission_error(
        "input",
        "past_end_of_stream",
        env.resolved(t),
    ))
}

fn get_char(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match want_input(m, env, &args[0], StreamType::Text) {
        Ok(id) => id,
        Err(p) => return p,
    };
    let got = m.streams.get_mut(id).expect("resolved").get_char();
    match got {
        Ok(Got::Item(c)) => m.unify_then(env, &args[1], &Term::atom(c.to_string()), k),
        Ok(Got::Eof) => m.unify_then(env, &args[1], &Term::atom("end_of_file"), k),
        Ok(Got::PastEof) => past_eof_error(env, &args[0]),
        Err(e) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
    }
}

fn peek_char(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match want_input(m, env, &args[0], StreamType::Text) {
        Ok(id) => id,
        Err(p) => return p,
    };
    let stream = m.streams.get_mut(id).expect("resolved");
    let got = stream.get_char();
    match got {
        Ok(Got::Item(c)) => {
            stream.unread_char(c);
            m.unify_then(env, &args[1], &Term::atom(c.to_string()), k)
        }
        Ok(Got::Eof) => m.unify_then(env, &args[1], &Term::atom("end_of_file"), k),
        Ok(Got::PastEof) => past_eof_error(env, &args[0]),
        Err(e) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
    }
}

fn put_char(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match want_output(m, env, &args[0], StreamType::Text) {
        Ok(id) => id,
        Err(p) => return p,
    };
    let c = env.resolve(&args[1]).clone();
    let c = match &c {
        Term::Var(_) => return Promise::Error(instantiation_error(c)),
        Term::Atom(a) if a.as_str().chars().count() == 1 => {
            a.as_str().chars().next().expect("one char")
        }
        other => return Promise::Error(type_error("character", env.resolved(other))),
    };
    match m
        .streams
        .get_mut(id)
        .expect("resolved")
        .write_str(&c.to_string())
    {
        Ok(()) => k(m, env),
        Err(e) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
    }
}

fn get_byte(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match want_input(m, env, &args[0], StreamType::Binary) {
        Ok(id) => id,
        Err(p) => return p,
    };
    let got = m.streams.get_mut(id).expect("resolved").get_byte();
    match got {
        Ok(Got::Item(b)) => m.unify_then(env, &args[1], &Term::int(b as i64), k),
        Ok(Got::Eof) => m.unify_then(env, &args[1], &Term::int(-1), k),
        Ok(Got::PastEof) => past_eof_error(env, &args[0]),
        Err(e) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
    }
}

fn peek_byte(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match want_input(m, env, &args[0], StreamType::Binary) {
        Ok(id) => id,
        Err(p) => return p,
    };
    let stream = m.streams.get_mut(id).expect("resolved");
    let got = stream.get_byte();
    match got {
        Ok(Got::Item(b)) => {
            stream.unread_byte(b);
            m.unify_then(env, &args[1], &Term::int(b as i64), k)
        }
        Ok(Got::Eof) => m.unify_then(env, &args[1], &Term::int(-1), k),
        Ok(Got::PastEof) => past_eof_error(env, &args[0]),
        Err(e) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
    }
}

fn put_byte(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match want_output(m, env, &args[0], StreamType::Binary) {
        Ok(id) => id,
        Err(p) => return p,
    };
    let b = env.resolve(&args[1]).clone();
    let b = match &b {
        Term::Var(_) => return Promise::Error(instantiation_error(b)),
        Term::Int(i) if (0..=255).contains(i) => *i as u8,
        other => return Promise::Error(type_error("byte", env.resolved(other))),
    };
    match m.streams.get_mut(id).expect("resolved").write_byte(b) {
        Ok(()) => k(m, env),
        Err(e) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
    }
}

// ----------------------------------------------------------------------
// term reading

struct ReadTargets {
    variables: Option<Term>,
    variable_names: Option<Term>,
    singletons: Option<Term>,
}

fn parse_read_options(env: &Env, list: &Term) -> Result<ReadTargets, Promise> {
    let mut targets = ReadTargets {
        variables: None,
        variable_names: None,
        singletons: None,
    };
    let (items, tail) = env.list_view(list);
    if tail.is_var() {
        return Err(Promise::Error(instantiation_error(tail)));
    }
    if !tail.is_nil() {
        return Err(Promise::Error(type_error("list", env.resolved(list))));
    }
    for item in items {
        let item = env.resolve(&item).clone();
        if item.is_var() {
            return Err(Promise::Error(instantiation_error(item)));
        }
        let Some(c) = item.as_compound().filter(|c| c.arity() == 1) else {
            return Err(Promise::Error(domain_error(
                "read_option",
                env.resolved(&item),
            )));
        };
        let value = c.args()[0].clone();
        match c.functor().as_str() {
            "variables" => targets.variables = Some(value),
            "variable_names" => targets.variable_names = Some(value),
            "singletons" => targets.singletons = Some(value),
            _ => {
                return Err(Promise::Error(domain_error(
                    "read_option",
                    env.resolved(&item),
                )))
            }
        }
    }
    Ok(targets)
}

/// `read_term(Stream, Term, Options)`: parse exactly one term off the
/// stream, leaving the stream position just past the consumed input.
fn read_term3(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match want_input(m, env, &args[0], StreamType::Text) {
        Ok(id) => id,
        Err(p) => return p,
    };
    let targets = match parse_read_options(env, &args[2]) {
        Ok(targets) => targets,
        Err(p) => return p,
    };
    let mut stream = m.streams.take(id).expect("resolved id exists");
    let past_eof = Rc::new(Cell::new(false));
    let (outcome, pending) = {
        let past_eof = past_eof.clone();
        let stream = &mut stream;
        let source = FnSource(move || match stream.get_char() {
            Ok(Got::Item(c)) => Some(c),
            Ok(Got::Eof) => None,
            Ok(Got::PastEof) | Err(_) => {
                past_eof.set(true);
                None
            }
        });
        let mut lexer = Lexer::new(source);
        lexer.set_conv(m.active_conv());
        let outcome = Reader::new(&mut lexer, &m.ops).read_term();
        (outcome, lexer.take_pending())
    };
    // hand unconsumed lookahead characters back to the stream
    for c in pending.into_iter().rev() {
        stream.unread_char(c);
    }
    m.streams.put_back(id, stream);
    if past_eof.get() {
        return past_eof_error(env, &args[0]);
    }
    match outcome {
        Ok(None) => m.unify_then(env, &args[1], &Term::atom("end_of_file"), k),
        Ok(Some(read)) => {
            let mut target = vec![args[1].clone()];
            let mut cand = vec![read.term.clone()];
            if let Some(t) = targets.variables {
                target.push(t);
                cand.push(Term::list(
                    read.variables.iter().cloned().map(Term::var).collect::<Vec<_>>(),
                ));
            }
            if let Some(t) = targets.variable_names {
                target.push(t);
                cand.push(bindings_list(&read.variable_names));
            }
            if let Some(t) = targets.singletons {
                target.push(t);
                cand.push(bindings_list(&read.singletons));
            }
            let target = Term::compound("r", target);
            let cand = Term::compound("r", cand);
            m.unify_then(env, &target, &cand, k)
        }
        Err(e) => Promise::Error(syntax_error(e.detail())),
    }
}

fn bindings_list(pairs: &[(smartstring::alias::String, horn_terms::Var)]) -> Term {
    Term::list(
        pairs
            .iter()
            .map(|(name, var)| {
                func![
                    "=";
                    Term::atom(name.as_str()),
                    Term::var(var.clone())
                ]
            })
            .collect::<Vec<_>>(),
    )
}

fn read1(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let with_stream = [
        StreamTab::term_for(m.streams.current_input()),
        args[0].clone(),
        Term::nil(),
    ];
    read_term3(m, env, &with_stream, k)
}

fn read2(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let with_opts = [args[0].clone(), args[1].clone(), Term::nil()];
    read_term3(m, env, &with_opts, k)
}

// ----------------------------------------------------------------------
// term writing

fn parse_write_options(env: &Env, list: &Term) -> Result<WriteOpts, Promise> {
    let mut opts = WriteOpts {
        quoted: false,
        ignore_ops: false,
        numbervars: false,
    };
    let (items, tail) = env.list_view(list);
    if tail.is_var() {
        return Err(Promise::Error(instantiation_error(tail)));
    }
    if !tail.is_nil() {
        return Err(Promise::Error(type_error("list", env.resolved(list))));
    }
    for item in items {
        let item = env.resolve(&item).clone();
        if item.is_var() {
            return Err(Promise::Error(instantiation_error(item)));
        }
        let invalid = || {
            Promise::Error(domain_error("write_option", env.resolved(&item)))
        };
        let Some(c) = item.as_compound().filter(|c| c.arity() == 1) else {
            return Err(invalid());
        };
        let flag = match env.resolve(&c.args()[0]) {
            Term::Atom(a) if *a == "true" => true,
            Term::Atom(a) if *a == "false" => false,
            _ => return Err(invalid()),
        };
        match c.functor().as_str() {
            "quoted" => opts.quoted = flag,
            "ignore_ops" => opts.ignore_ops = flag,
            "numbervars" => opts.numbervars = flag,
            _ => return Err(invalid()),
        }
    }
    Ok(opts)
}

fn write_with_opts(
    m: &mut Machine,
    env: &mut Env,
    stream: &Term,
    t: &Term,
    opts: WriteOpts,
    k: &Cont,
) -> Promise {
    let id = match want_output(m, env, stream, StreamType::Text) {
        Ok(id) => id,
        Err(p) => return p,
    };
    let text = t.display(env).with_ops(&m.ops).with_opts(opts).to_string();
    match m.streams.get_mut(id).expect("resolved").write_str(&text) {
        Ok(()) => k(m, env),
        Err(e) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
    }
}

fn write_term3(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let opts = match parse_write_options(env, &args[2]) {
        Ok(opts) => opts,
        Err(p) => return p,
    };
    let stream = args[0].clone();
    write_with_opts(m, env, &stream, &args[1].clone(), opts, k)
}

fn write1(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let stream = StreamTab::term_for(m.streams.current_output());
    write_with_opts(m, env, &stream, &args[0].clone(), WriteOpts::default(), k)
}

fn write2(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let stream = args[0].clone();
    write_with_opts(m, env, &stream, &args[1].clone(), WriteOpts::default(), k)
}

fn writeq1(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let stream = StreamTab::term_for(m.streams.current_output());
    let opts = WriteOpts {
        quoted: true,
        ..WriteOpts::default()
    };
    write_with_opts(m, env, &stream, &args[0].clone(), opts, k)
}

fn write_canonical1(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let stream = StreamTab::term_for(m.streams.current_output());
    let opts = WriteOpts {
        quoted: true,
        ignore_ops: true,
        numbervars: false,
    };
    write_with_opts(m, env, &stream, &args[0].clone(), opts, k)
}

fn nl1(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match want_output(m, env, &args[0], StreamType::Text) {
        Ok(id) => id,
        Err(p) => return p,
    };
    match m.streams.get_mut(id).expect("resolved").write_str("\n") {
        Ok(()) => k(m, env),
        Err(e) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
    }
}

fn nl0(m: &mut Machine, env: &mut Env, _args: &[Term], k: &Cont) -> Promise {
    let with_stream = [StreamTab::term_for(m.streams.current_output())];
    nl1(m, env, &with_stream, k)
}

// ----------------------------------------------------------------------
// stream properties and repositioning

fn stream_property(m: &mut Machine, _env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let target = func!["p"; args[0].clone(), args[1].clone()];
    let mut candidates = Vec::new();
    for (id, stream) in m.streams.iter() {
        let handle = StreamTab::term_for(id);
        let mut props: Vec<Term> = Vec::new();
        if let Some(name) = &stream.file_name {
            props.push(func!["file_name"; Term::atom(name.as_str())]);
        }
        props.push(func!["mode"; stream.mode.atom()]);
        props.push(Term::atom(if stream.is_input() { "input" } else { "output" }));
        if let Some(alias) = &stream.alias {
            props.push(func!["alias"; Term::Atom(alias.clone())]);
        }
        props.push(func!["position"; Term::int(stream.position() as i64)]);
        if stream.is_input() {
            let state = if stream.past_eof() { "past" } else { "not" };
            props.push(func!["end_of_stream"; Term::atom(state)]);
        }
        props.push(func!["eof_action"; stream.eof_action.atom()]);
        props.push(func![
            "reposition";
            Term::atom(if stream.reposition { "true" } else { "false" })
        ]);
        props.push(func!["type"; stream.typ.atom()]);
        for p in props {
            candidates.push(func!["p"; handle.clone(), p]);
        }
    }
    unify_candidates(&target, candidates, k)
}

fn set_stream_position(m: &mut Machine, env: &mut Env, args: &[Term], k: &Cont) -> Promise {
    let id = match m.streams.resolve(env, &args[0]) {
        Ok(id) => id,
        Err(e) => return Promise::Error(e),
    };
    let pos = env.resolve(&args[1]).clone();
    let pos = match &pos {
        Term::Var(_) => return Promise::Error(instantiation_error(pos)),
        Term::Int(p) if *p >= 0 => *p as u64,
        other => {
            return Promise::Error(domain_error(
                "stream_position",
                env.resolved(other),
            ))
        }
    };
    let stream = m.streams.get_mut(id).expect("resolved");
    if !stream.reposition {
        return Promise::Error(permission_error(
            "reposition",
            "stream",
            env.resolved(&args[0]),
        ));
    }
    match stream.seek_to(pos) {
        Ok(()) => k(m, env),
        Err(e) => Promise::Error(resource_error("stream", Term::atom(e.to_string()))),
    }
}
