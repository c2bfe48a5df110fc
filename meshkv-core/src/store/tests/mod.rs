/*
    Store-level integration tests.

    Multi-store scenarios that exercise conflict resolution and log
    replay across simulated nodes, without the network layer.
*/
