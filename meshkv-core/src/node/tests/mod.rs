/*
    Node-level integration tests.

    Run real servers on ephemeral ports and drive them over TCP.
*/

mod service_tests;
