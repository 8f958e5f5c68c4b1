use super::*;

#[test]
fn tags() {
    let block = PeerMessage::Block {
        sender: 3,
        iteration: 2,
        phase: 1,
        data: vec![1.0; 4],
    };
    assert_eq!(
        block.tag(),
        Some(Tag::Block {
            sender: 3,
            iteration: 2,
            phase: 1
        })
    );

    let collective = PeerMessage::Collective {
        sender: 1,
        sequence: 9,
        payload: CollectivePayload::Flag(true),
    };
    assert_eq!(
        collective.tag(),
        Some(Tag::Collective {
            sender: 1,
            sequence: 9
        })
    );

    let abort = PeerMessage::Abort {
        sender: 2,
        reason: "boom".to_string(),
    };
    assert_eq!(abort.tag(), None);
    assert_eq!(abort.sender(), 2);
}

#[test]
fn parameters_survive_the_wire() {
    let parameters = Parameters {
        threads: 4,
        order: 96,
        collapse: true,
        ..Parameters::default()
    };
    let message = PeerMessage::Collective {
        sender: 0,
        sequence: 0,
        payload: CollectivePayload::Parameters(Some(parameters)),
    };
    let bytes = bincode::serialize(&message).unwrap();
    let decoded: PeerMessage = bincode::deserialize(&bytes).unwrap();
    assert_eq!(decoded, message);
}

#[test]
fn block_payload_is_dense() {
    let message = PeerMessage::Block {
        sender: 0,
        iteration: 0,
        phase: 1,
        data: vec![0.5; 100],
    };
    let bytes = bincode::serialize(&message).unwrap();
    // Variant index, three integers and the vector length around 800 bytes of data.
    assert_eq!(bytes.len(), 4 + 8 * 3 + 8 + 800);
}
