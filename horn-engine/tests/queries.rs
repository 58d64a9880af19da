//! End-to-end queries through the full pipeline: reader, compiler,
//! resolver, promise machinery, and the built-in kernel.

use horn_engine::{Exception, Machine};
use horn_terms::{Env, Term};

/// All solutions for `var`, rendered canonically.
fn solutions(m: &mut Machine, query: &str, var: &str) -> Vec<String> {
    m.query(query)
        .unwrap()
        .map(|r| {
            let bindings = r.unwrap();
            bindings.get(var).unwrap().display(&Env::new()).to_string()
        })
        .collect()
}

fn ball(m: &mut Machine, query: &str) -> Term {
    match m.query(query).unwrap().next() {
        Some(Err(Exception::Ball(t))) => t,
        other => panic!("expected an exception, got {other:?}"),
    }
}

fn formal_name(ball: &Term) -> String {
    let args = ball.as_struct("error", 2).expect("error/2 ball");
    args[0]
        .name()
        .map(|a| a.as_str().to_string())
        .unwrap_or_else(|| args[0].display(&Env::new()).to_string())
}

#[test]
fn append_has_one_solution() {
    let mut m = Machine::with_buffers();
    m.consult(
        "append([], L, L).
         append([H|T], L, [H|R]) :- append(T, L, R).",
    )
    .unwrap();
    assert_eq!(
        solutions(&mut m, "append([a, b], [c, d], X).", "X"),
        vec!["[a, b, c, d]"]
    );
    // running backwards enumerates the splits
    assert_eq!(
        solutions(&mut m, "append(X, _, [a, b]).", "X").len(),
        3
    );
}

#[test]
fn cut_commits_to_the_second_clause() {
    let mut m = Machine::with_buffers();
    m.consult("p(a). p(b) :- !. p(c).").unwrap();
    assert_eq!(solutions(&mut m, "p(X).", "X"), vec!["a", "b"]);
}

#[test]
fn cut_is_opaque_inside_call() {
    let mut m = Machine::with_buffers();
    m.consult("r(1). r(2).").unwrap();
    assert_eq!(
        solutions(&mut m, "r(X), call(!).", "X"),
        vec!["1", "2"]
    );
    m.consult("s(X) :- call((r(X), !)).").unwrap();
    assert_eq!(solutions(&mut m, "s(X).", "X"), vec!["1"]);
}

#[test]
fn catch_intercepts_throw() {
    let mut m = Machine::with_buffers();
    assert_eq!(
        solutions(&mut m, "catch(throw(oops), E, E = oops).", "E"),
        vec!["oops"]
    );
}

#[test]
fn catch_is_transparent_to_backtracking() {
    let mut m = Machine::with_buffers();
    m.consult("r(1). r(2).").unwrap();
    assert_eq!(
        solutions(&mut m, "catch(r(X), _, fail).", "X"),
        vec!["1", "2"]
    );
}

#[test]
fn catch_survives_a_cut_in_its_goal() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("catch((!, throw(x)), x, true).").unwrap());
    assert!(!m.prove("catch((!, fail), _, true).").unwrap());
}

#[test]
fn uncaught_balls_propagate() {
    let mut m = Machine::with_buffers();
    let t = ball(&mut m, "catch(throw(a), b, true).");
    assert_eq!(t, Term::atom("a"));
}

#[test]
fn thrown_terms_are_snapshots() {
    let mut m = Machine::with_buffers();
    // the ball carries a fresh variable, not X itself
    assert!(m
        .prove("catch(throw(f(X)), E, (E = f(Y), var(Y), X \\== Y)).")
        .unwrap());
}

#[test]
fn setof_sorts_and_dedupes() {
    let mut m = Machine::with_buffers();
    m.consult(
        "foo(a, b, c). foo(a, b, d). foo(b, c, e). foo(b, c, f). foo(c, c, g).",
    )
    .unwrap();
    assert_eq!(
        solutions(&mut m, "setof(Z, X^Y^foo(X, Y, Z), L).", "L"),
        vec!["[c, d, e, f, g]"]
    );
}

#[test]
fn bagof_groups_by_witness() {
    let mut m = Machine::with_buffers();
    m.consult("num(a, 1). num(b, 1). num(c, 2).").unwrap();
    assert_eq!(
        solutions(&mut m, "bagof(X, num(X, Y), L).", "L"),
        vec!["[a, b]", "[c]"]
    );
    assert_eq!(
        solutions(&mut m, "bagof(X, num(X, Y), L).", "Y"),
        vec!["1", "2"]
    );
    assert!(!m.prove("bagof(X, num(X, nowhere), L).").unwrap());
}

#[test]
fn setof_is_the_sorted_unique_bagof() {
    let mut m = Machine::with_buffers();
    m.consult("v(3). v(1). v(3). v(2).").unwrap();
    assert_eq!(
        solutions(&mut m, "bagof(X, v(X), L).", "L"),
        vec!["[3, 1, 3, 2]"]
    );
    assert_eq!(
        solutions(&mut m, "setof(X, v(X), L).", "L"),
        vec!["[1, 2, 3]"]
    );
    assert!(!m.prove("bagof(X, v(none), L).").unwrap());
    assert!(!m.prove("setof(X, v(none), L).").unwrap());
}

#[test]
fn findall_collects_copies_and_allows_empty() {
    let mut m = Machine::with_buffers();
    m.consult("r(1). r(2).").unwrap();
    assert_eq!(
        solutions(&mut m, "findall(X - a, r(X), L).", "L"),
        vec!["[1-a, 2-a]"]
    );
    assert_eq!(solutions(&mut m, "findall(X, fail, L).", "L"), vec!["[]"]);
}

#[test]
fn assertz_then_retract() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("assertz(q(1)).").unwrap());
    assert!(m.prove("assertz(q(2)).").unwrap());
    assert_eq!(solutions(&mut m, "retract(q(X)).", "X"), vec!["1", "2"]);
    // only the backtracked-over removals stuck: the first solution
    // removed q(1), resuming removed q(2)
    assert!(!m.prove("q(_).").unwrap());
}

#[test]
fn retract_removes_before_the_continuation_runs() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("assertz(q(1)), assertz(q(2)).").unwrap());
    assert!(m.prove("retract(q(X)), X = 1, \\+ q(1), q(2).").unwrap());
    assert_eq!(solutions(&mut m, "q(Y).", "Y"), vec!["2"]);
}

#[test]
fn asserta_prepends() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("assertz(o(1)), asserta(o(0)).").unwrap());
    assert_eq!(solutions(&mut m, "o(X).", "X"), vec!["0", "1"]);
}

#[test]
fn consulted_procedures_are_static() {
    let mut m = Machine::with_buffers();
    m.consult("fixed(1).").unwrap();
    let t = ball(&mut m, "assertz(fixed(2)).");
    assert_eq!(formal_name(&t), "permission_error");
    let t = ball(&mut m, "abolish(fixed/1).");
    assert_eq!(formal_name(&t), "permission_error");
}

#[test]
fn dynamic_declaration_lifts_the_protection() {
    let mut m = Machine::with_buffers();
    m.consult(":- dynamic(counter/1). counter(0).").unwrap();
    assert!(m.prove("retract(counter(0)), assertz(counter(1)).").unwrap());
    assert_eq!(solutions(&mut m, "counter(X).", "X"), vec!["1"]);
}

#[test]
fn abolish_drops_the_whole_procedure() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("assertz(tmp(1)), assertz(tmp(2)).").unwrap());
    assert!(m.prove("abolish(tmp/1).").unwrap());
    let t = ball(&mut m, "tmp(_).");
    assert_eq!(formal_name(&t), "existence_error");
}

#[test]
fn clause_reads_the_database() {
    let mut m = Machine::with_buffers();
    assert!(m
        .prove("assertz((even(X) :- 0 is X mod 2)).")
        .unwrap());
    assert!(m.prove("clause(even(_), (0 is _ mod 2)).").unwrap());
    assert!(m.prove("even(4).").unwrap());
    assert!(!m.prove("even(3).").unwrap());
}

#[test]
fn current_predicate_enumerates_user_procedures() {
    let mut m = Machine::with_buffers();
    m.consult("zebra(x).").unwrap();
    assert!(m.prove("current_predicate(zebra/1).").unwrap());
    assert!(!m.prove("current_predicate(zebra/2).").unwrap());
    assert_eq!(
        solutions(&mut m, "current_predicate(zebra/N).", "N"),
        vec!["1"]
    );
}

#[test]
fn occurs_check_rejects_cycles_plain_unification_permits_them() {
    let mut m = Machine::with_buffers();
    assert!(!m.prove("unify_with_occurs_check(X, f(X)).").unwrap());
    // rational tree: no exception, and the writer elides the cycle
    assert!(m.prove("X = f(X).").unwrap());
    assert!(m.prove("X = f(X), X = f(Y), Y == X.").unwrap());
}

#[test]
fn environment_is_restored_across_failed_branches() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("(X = 1, fail ; var(X)).").unwrap());
}

#[test]
fn solution_order_is_deterministic() {
    let mut m = Machine::with_buffers();
    m.consult("d(3). d(1). d(2).").unwrap();
    let first = solutions(&mut m, "d(X).", "X");
    let second = solutions(&mut m, "d(X).", "X");
    assert_eq!(first, vec!["3", "1", "2"]);
    assert_eq!(first, second);
}

#[test]
fn if_then_else_commits_to_the_first_condition_solution() {
    let mut m = Machine::with_buffers();
    m.consult("c(1). c(2).").unwrap();
    assert_eq!(
        solutions(&mut m, "(c(X) -> true ; X = none).", "X"),
        vec!["1"]
    );
    assert_eq!(
        solutions(&mut m, "(fail -> X = then ; X = else).", "X"),
        vec!["else"]
    );
    assert!(!m.prove("(fail -> true).").unwrap());
    m.consult("max(X, Y, Z) :- (X >= Y -> Z = X ; Z = Y).").unwrap();
    assert_eq!(solutions(&mut m, "max(3, 5, M).", "M"), vec!["5"]);
}

#[test]
fn negation_as_failure() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("\\+ fail.").unwrap());
    assert!(!m.prove("\\+ true.").unwrap());
    // bindings made inside the negated goal do not leak
    assert!(m.prove("\\+ (X = 1, fail), var(X).").unwrap());
}

#[test]
fn repeat_with_cut_succeeds_once() {
    let mut m = Machine::with_buffers();
    assert_eq!(solutions(&mut m, "repeat, X = 1, !.", "X"), vec!["1"]);
}

#[test]
fn arithmetic_evaluation() {
    let mut m = Machine::with_buffers();
    assert_eq!(solutions(&mut m, "X is 3 + 4 * 2.", "X"), vec!["11"]);
    assert_eq!(solutions(&mut m, "X is 7 // 2.", "X"), vec!["3"]);
    assert_eq!(solutions(&mut m, "X is 2.5 * 2.", "X"), vec!["5.0"]);
    assert!(m.prove("1 + 2 =:= 3.").unwrap());
    assert!(m.prove("1 < 2, 2 =< 2, 3 > 2, 2 >= 2, 1 =\\= 2.").unwrap());
    assert!(!m.prove("1 =:= 2.").unwrap());
}

#[test]
fn arithmetic_errors() {
    let mut m = Machine::with_buffers();
    assert_eq!(formal_name(&ball(&mut m, "X is 1 / 0.")), "evaluation_error");
    assert_eq!(formal_name(&ball(&mut m, "X is foo + 1.")), "type_error");
    assert_eq!(formal_name(&ball(&mut m, "X is Y + 1.")), "instantiation_error");
}

#[test]
fn resolver_errors() {
    let mut m = Machine::with_buffers();
    assert_eq!(formal_name(&ball(&mut m, "undefined_thing.")), "existence_error");
    assert_eq!(formal_name(&ball(&mut m, "call(X).")), "instantiation_error");
    assert_eq!(formal_name(&ball(&mut m, "call(1).")), "type_error");
}

#[test]
fn unknown_flag_controls_undefined_procedures() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("set_prolog_flag(unknown, fail).").unwrap());
    assert!(!m.prove("undefined_thing.").unwrap());
    assert!(m.prove("set_prolog_flag(unknown, error).").unwrap());
    assert_eq!(formal_name(&ball(&mut m, "undefined_thing.")), "existence_error");
}

#[test]
fn flag_table_reads_back() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("current_prolog_flag(bounded, true).").unwrap());
    assert!(m
        .prove("current_prolog_flag(integer_rounding_function, toward_zero).")
        .unwrap());
    assert_eq!(
        formal_name(&ball(&mut m, "set_prolog_flag(bounded, false).")),
        "permission_error"
    );
    assert_eq!(
        formal_name(&ball(&mut m, "current_prolog_flag(no_such, _).")),
        "domain_error"
    );
}

#[test]
fn structural_builtins() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("functor(foo(a, b), foo, 2).").unwrap());
    assert_eq!(solutions(&mut m, "functor(T, foo, 2).", "T").len(), 1);
    assert!(m.prove("functor(T, foo, 0), T == foo.").unwrap());
    assert_eq!(solutions(&mut m, "arg(2, foo(a, b, c), A).", "A"), vec!["b"]);
    assert_eq!(
        solutions(&mut m, "arg(N, foo(a, b), _).", "N"),
        vec!["1", "2"]
    );
    assert_eq!(
        solutions(&mut m, "foo(a, b) =.. L.", "L"),
        vec!["[foo, a, b]"]
    );
    assert_eq!(
        solutions(&mut m, "T =.. [foo, x].", "T"),
        vec!["foo(x)"]
    );
    assert!(m.prove("copy_term(f(X, X, a), f(Y, Z, a)), Y == Z, Y \\== X.").unwrap());
}

#[test]
fn term_order_builtins() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("compare(Order, 1, a), Order == (<).").unwrap());
    assert!(m.prove("a @< b, b @> a, a @=< a, a @>= a.").unwrap());
    assert!(m.prove("f(a) == f(a), f(a) \\== f(b).").unwrap());
    assert!(m.prove("1.0 @< 1.").unwrap());
    assert_eq!(formal_name(&ball(&mut m, "compare(less, 1, 2).")), "domain_error");
}

#[test]
fn type_check_builtins() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("var(_), nonvar(a), atom(a), integer(1), float(1.5).").unwrap());
    assert!(m.prove("number(1), number(1.5), atomic(a), atomic(1).").unwrap());
    assert!(m.prove("compound(f(a)), callable(f(a)), callable(a).").unwrap());
    assert!(m.prove("is_list([1, 2]), \\+ is_list([1|_]).").unwrap());
    assert!(!m.prove("atom(f(a)).").unwrap());
    assert!(!m.prove("atomic(f(a)).").unwrap());
}

#[test]
fn atom_text_builtins() {
    let mut m = Machine::with_buffers();
    assert_eq!(solutions(&mut m, "atom_length(hello, N).", "N"), vec!["5"]);
    assert_eq!(
        solutions(&mut m, "atom_concat(foo, bar, A).", "A"),
        vec!["foobar"]
    );
    assert_eq!(
        solutions(&mut m, "atom_concat(A, _, ab).", "A"),
        vec!["", "a", "ab"]
    );
    assert_eq!(
        solutions(&mut m, "sub_atom(abc, 1, 2, _, S).", "S"),
        vec!["bc"]
    );
    assert_eq!(
        solutions(&mut m, "atom_chars(ab, L).", "L"),
        vec!["[a, b]"]
    );
    assert!(m.prove("atom_chars(A, [a, b]), A == ab.").unwrap());
    assert_eq!(
        solutions(&mut m, "atom_codes(ab, L).", "L"),
        vec!["[97, 98]"]
    );
    assert!(m.prove("number_chars(N, ['1', '2']), N =:= 12.").unwrap());
    assert!(m.prove("number_chars(12, L), L == ['1', '2'].").unwrap());
    assert!(m.prove("number_codes(N, \"34\"), N =:= 34.").unwrap());
    assert!(m.prove("char_code(a, 97), char_code(C, 98), C == b.").unwrap());
    assert_eq!(
        formal_name(&ball(&mut m, "number_chars(N, [a]).")),
        "syntax_error"
    );
}

#[test]
fn round_trip_between_atoms_and_text() {
    let mut m = Machine::with_buffers();
    assert!(m
        .prove("atom_chars(hello, Cs), atom_chars(A, Cs), A == hello.")
        .unwrap());
    assert!(m
        .prove("number_chars(3.5, Cs), number_chars(N, Cs), N =:= 3.5.")
        .unwrap());
    assert!(m
        .prove("f(a, b) =.. L, T =.. L, T == f(a, b).")
        .unwrap());
}

#[test]
fn operator_definitions_feed_the_reader() {
    let mut m = Machine::with_buffers();
    m.consult(":- op(700, xfx, ===).").unwrap();
    assert_eq!(
        solutions(&mut m, "(a === b) =.. L.", "L"),
        vec!["[===, a, b]"]
    );
    assert!(m.prove("current_op(700, xfx, ===).").unwrap());
    assert!(m.prove("op(0, xfx, ===).").unwrap());
    assert!(!m.prove("current_op(_, _, ===).").unwrap());
    assert_eq!(
        formal_name(&ball(&mut m, "op(100, xfx, ',').")),
        "permission_error"
    );
    assert_eq!(
        formal_name(&ball(&mut m, "op(1300, xfx, bad).")),
        "domain_error"
    );
}

#[test]
fn write_and_nl_reach_the_output_buffer() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("write(hello), nl, write([1, 2|T]).").unwrap());
    assert_eq!(m.output_text(), "hello\n[1, 2|T]");
}

#[test]
fn write_term_options() {
    let mut m = Machine::with_buffers();
    assert!(m
        .prove("write_term(user_output, 'hello world', [quoted(true)]).")
        .unwrap());
    assert!(m
        .prove("nl, write_term(user_output, 1 + 2, [ignore_ops(true)]).")
        .unwrap());
    assert_eq!(m.output_text(), "'hello world'\n+(1, 2)");
    assert_eq!(
        formal_name(&ball(&mut m, "write_term(user_output, x, [bad_opt]).")),
        "domain_error"
    );
}

#[test]
fn writeq_quotes_and_write_canonical_ignores_ops() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("writeq('a b'), nl, write_canonical(1 + 2).").unwrap());
    assert_eq!(m.output_text(), "'a b'\n+(1, 2)");
}

#[test]
fn read_terms_incrementally_from_a_stream() {
    let mut m = Machine::with_buffers();
    m.set_user_input("foo(X, bar). rest. ");
    assert!(m
        .prove("read(T1), T1 = foo(_, bar), read(T2), T2 == rest, read(T3), T3 == end_of_file.")
        .unwrap());
}

#[test]
fn read_term_reports_variable_lists() {
    let mut m = Machine::with_buffers();
    m.set_user_input("f(X, Y, X, _). ");
    assert!(m
        .prove(
            "read_term(user_input, T, [variables(Vs), variable_names(Ns), singletons(Ss)]), \
             T = f(A, B, A, _), \
             Vs = [_, _, _], \
             Ns = ['X' = A, 'Y' = B], \
             Ss = ['Y' = B]."
        )
        .unwrap());
}

#[test]
fn read_syntax_error_is_thrown() {
    let mut m = Machine::with_buffers();
    m.set_user_input("f(. ");
    assert_eq!(formal_name(&ball(&mut m, "read(T).")), "syntax_error");
}

#[test]
fn char_and_byte_transfer() {
    let mut m = Machine::with_buffers();
    m.set_user_input("ab");
    assert!(m
        .prove("peek_char(user_input, a), get_char(user_input, a), get_char(user_input, b), get_char(user_input, end_of_file).")
        .unwrap());
    // output streams refuse input operations
    assert_eq!(
        formal_name(&ball(&mut m, "get_char(user_output, _).")),
        "permission_error"
    );
    // text streams refuse byte operations
    m.set_user_input("x");
    assert_eq!(
        formal_name(&ball(&mut m, "get_byte(user_input, _).")),
        "permission_error"
    );
    assert!(m.prove("put_char(user_output, z).").unwrap());
    assert_eq!(m.output_text(), "z");
}

#[test]
fn stream_slots_and_properties() {
    let mut m = Machine::with_buffers();
    assert!(m
        .prove("current_input(S), stream_property(S, alias(user_input)).")
        .unwrap());
    assert!(m
        .prove("current_output(S), stream_property(S, mode(write)).")
        .unwrap());
    assert!(m.prove("current_input(S), set_input(S).").unwrap());
    assert_eq!(
        formal_name(&ball(&mut m, "current_output(S), set_input(S).")),
        "permission_error"
    );
    assert_eq!(formal_name(&ball(&mut m, "set_input(nostream).")), "existence_error");
    assert!(m.prove("flush_output.").unwrap());
}

#[test]
fn set_stream_position_requires_repositionability() {
    let mut m = Machine::with_buffers();
    m.set_user_input("abc");
    assert!(m
        .prove(
            "get_char(user_input, a), current_input(S), \
             set_stream_position(S, 0), get_char(user_input, a)."
        )
        .unwrap());
}

#[test]
fn halt_carries_the_exit_code() {
    let mut m = Machine::with_buffers();
    match m.query("halt(3).").unwrap().next() {
        Some(Err(Exception::Halt(3))) => {}
        other => panic!("expected halt(3), got {other:?}"),
    }
    match m.query("catch(halt(1), _, true).").unwrap().next() {
        Some(Err(Exception::Halt(1))) => {}
        other => panic!("halt must not be catchable, got {other:?}"),
    }
}

#[test]
fn char_conversion_applies_when_enabled() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("char_conversion(q, a).").unwrap());
    assert!(m.prove("current_char_conversion(q, a).").unwrap());
    // off by default: q is still read as q
    assert!(m.prove("atom(q).").unwrap());
    assert!(m.prove("set_prolog_flag(char_conversion, on).").unwrap());
    assert_eq!(solutions(&mut m, "X = q.", "X"), vec!["a"]);
    // conversion applies to unquoted text only, so quoting names the
    // real character
    assert!(m.prove("char_conversion('q', 'q').").unwrap());
    assert!(!m.prove("current_char_conversion('q', _).").unwrap());
}

#[test]
fn call_with_extra_arguments() {
    let mut m = Machine::with_buffers();
    m.consult("plus(A, B, C) :- C is A + B.").unwrap();
    assert_eq!(solutions(&mut m, "call(plus(1), 2, X).", "X"), vec!["3"]);
    assert_eq!(solutions(&mut m, "call(plus, 1, 2, X).", "X"), vec!["3"]);
}

#[test]
fn variable_goals_in_bodies_are_called() {
    let mut m = Machine::with_buffers();
    m.consult("apply(G) :- G.").unwrap();
    assert!(m.prove("apply(true).").unwrap());
    assert_eq!(solutions(&mut m, "apply(X = 1).", "X"), vec!["1"]);
    assert_eq!(formal_name(&ball(&mut m, "apply(_).")), "instantiation_error");
}

#[test]
fn directives_execute_during_consult() {
    let mut m = Machine::with_buffers();
    m.consult(":- assertz(made_by_directive).").unwrap();
    assert!(m.prove("made_by_directive.").unwrap());
}

#[test]
fn assert_of_directive_executes_immediately() {
    let mut m = Machine::with_buffers();
    assert!(m.prove("assertz((:- assertz(side_effect))).").unwrap());
    assert!(m.prove("side_effect.").unwrap());
}

#[test]
fn assert_validates_clauses() {
    let mut m = Machine::with_buffers();
    assert_eq!(formal_name(&ball(&mut m, "assertz(X).")), "instantiation_error");
    assert_eq!(formal_name(&ball(&mut m, "assertz(7).")), "type_error");
    assert_eq!(
        formal_name(&ball(&mut m, "assertz((foo :- 7)).")),
        "type_error"
    );
}
