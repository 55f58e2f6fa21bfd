use larix::{automaton, grammar::Grammar};

macro_rules! define_tests {
    ($($name:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            let _ = tracing_subscriber::fmt::try_init();
            let grammar = Grammar::define(larix::grammar::examples::$name).unwrap();
            eprintln!("{}", grammar);
            let automaton = automaton::slr(&grammar).unwrap();
            eprintln!("automaton:\n---\n{}", automaton.display(&grammar));
        }
    )*};
}

define_tests! {
    arithmetic,
    braced_list,
    key_value_list,
}

#[test]
fn dangling_else_conflict() {
    let _ = tracing_subscriber::fmt::try_init();
    let grammar = Grammar::define(larix::grammar::examples::dangling_else).unwrap();
    let err = automaton::slr(&grammar).unwrap_err();
    eprintln!("{}", err);
}
