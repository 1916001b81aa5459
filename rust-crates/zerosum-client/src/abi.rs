//! Contract interfaces the client is written against.
//!
//! Quick Draw and Strategic games live on the standard game contract; Hardcore Mystery and
//! Last Stand live on the mystery contract, which hides the current number from `getGame`
//! and exposes it per player through `getPlayerView`. Each family has its own spectator
//! betting contract.

use alloy::sol;

sol! {
    struct StandardGameView {
        uint256 gameId;
        uint8 mode;
        uint8 status;
        address currentPlayer;
        address winner;
        uint256 entryFee;
        uint256 prizePool;
        uint256 currentNumber;
        uint256 moveCount;
        uint256 timeLeft;
        uint8 maxPlayers;
    }

    struct MysteryGameView {
        uint256 gameId;
        uint8 mode;
        uint8 status;
        address currentPlayer;
        address winner;
        uint256 entryFee;
        uint256 prizePool;
        uint256 moveCount;
        uint256 timeLeft;
        uint8 maxPlayers;
    }

    struct MysteryPlayerView {
        uint256 displayedNumber;
        bool numberRevealed;
        bool isActive;
        uint256 movesMade;
    }

    struct BettingPoolView {
        uint256 totalPool;
        uint256 betCount;
        bool bettingOpen;
        bool settled;
    }

    struct SpectatorBetView {
        uint256 amount;
        address predictedWinner;
        bool claimed;
        uint256 timestamp;
    }

    struct BetHistoryEntry {
        uint256 gameId;
        uint256 amount;
        address predictedWinner;
        bool claimed;
        uint256 timestamp;
    }

    #[sol(rpc)]
    interface StandardGame {
        event GameCreated(uint256 indexed gameId, address indexed creator, uint8 mode, uint256 entryFee);

        function gameCounter() external view returns (uint256);
        function getGame(uint256 gameId) external view returns (StandardGameView memory);
        function getPlayers(uint256 gameId) external view returns (address[] memory);
        function isGameBettable(uint256 gameId) external view returns (bool);

        function createGame(uint8 mode) external payable returns (uint256);
        function joinGame(uint256 gameId) external payable;
        function makeMove(uint256 gameId, uint256 subtraction) external;
        function handleTimeout(uint256 gameId) external;
        function cancelWaitingGame(uint256 gameId) external;
        function withdraw() external;
    }

    #[sol(rpc)]
    interface MysteryGame {
        event GameCreated(uint256 indexed gameId, address indexed creator, uint8 mode, uint256 entryFee);

        function gameCounter() external view returns (uint256);
        function getGame(uint256 gameId) external view returns (MysteryGameView memory);
        function getPlayers(uint256 gameId) external view returns (address[] memory);
        function getPlayerView(uint256 gameId, address player) external view returns (MysteryPlayerView memory);
        function isGameBettable(uint256 gameId) external view returns (bool);

        function createHardcoreMysteryGame() external payable returns (uint256);
        function createLastStandGame(uint8 maxPlayers) external payable returns (uint256);
        function joinGame(uint256 gameId) external payable;
        function makeMove(uint256 gameId, uint256 subtraction) external;
        function handleTimeout(uint256 gameId) external;
        function cancelWaitingGame(uint256 gameId) external;
        function withdraw() external;
    }

    #[sol(rpc)]
    interface SpectatorBetting {
        event BetPlaced(uint256 indexed gameId, address indexed bettor, address predictedWinner, uint256 amount);

        function placeBet(uint256 gameId, address predictedWinner) external payable;
        function claimBettingWinnings(uint256 gameId) external;
        function withdrawSpectatorBalance() external;

        function getGameBettingInfo(uint256 gameId) external view returns (BettingPoolView memory);
        function hasUserBetOnGame(uint256 gameId, address user) external view returns (bool);
        function getUserBetInfo(uint256 gameId, address user) external view returns (SpectatorBetView memory);
        function getUserBettingHistoryDetailed(address user) external view returns (BetHistoryEntry[] memory);
    }
}
