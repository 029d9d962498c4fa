use state_machines::state_machine;

state_machine! {
    name: SynthesisMachine,
    state: SynthesisState,
    initial: Ready,
    states: [Ready, Enriched, Retrieved, Generated, Failed],
    events {
        enrich { transition: { from: Ready, to: Enriched } }
        retrieve { transition: { from: Enriched, to: Retrieved } }
        generate { transition: { from: Retrieved, to: Generated } }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: Enriched, to: Failed }
            transition: { from: Retrieved, to: Failed }
            transition: { from: Generated, to: Failed }
        }
    }
}

pub fn ready() -> SynthesisMachine<(), Ready> {
    SynthesisMachine::new(())
}
