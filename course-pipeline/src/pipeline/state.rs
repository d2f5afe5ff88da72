use state_machines::state_machine;

state_machine! {
    name: CourseMachine,
    state: CourseState,
    initial: Ready,
    states: [Ready, Validated, Assembled, Condensed, Synthesized, Failed],
    events {
        validate { transition: { from: Ready, to: Validated } }
        assemble { transition: { from: Validated, to: Assembled } }
        condense { transition: { from: Assembled, to: Condensed } }
        synthesize { transition: { from: Condensed, to: Synthesized } }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: Validated, to: Failed }
            transition: { from: Assembled, to: Failed }
            transition: { from: Condensed, to: Failed }
            transition: { from: Synthesized, to: Failed }
        }
    }
}

pub fn ready() -> CourseMachine<(), Ready> {
    CourseMachine::new(())
}
